// Integration tests for the dictation session
//
// These drive a full session against an in-process mock transcription
// service (a real WebSocket endpoint speaking the wire protocol), a scripted
// capture backend, and a mock finalizer.

use futures::{SinkExt, StreamExt};
use scriven::finalize::{FinalizationRequest, FinalizationResponse, Finalizer};
use scriven::stt::{
    ServerMessage, SessionToken, StreamingConfig, TokenProvider, TranscriptPayload,
};
use scriven::{
    CaptureConfig, DictationError, DictationSession, RecordingState, ScriptedBackend,
    SessionConfig,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Mock collaborators
// ============================================================================

struct StaticTokens;

#[async_trait::async_trait]
impl TokenProvider for StaticTokens {
    async fn fetch_token(&self) -> Result<SessionToken, DictationError> {
        Ok(SessionToken {
            token: "test-token".to_string(),
            expires_in: 300,
        })
    }
}

struct MockFinalizer {
    response: Option<FinalizationResponse>,
}

impl MockFinalizer {
    fn success(final_text: &str) -> Self {
        Self {
            response: Some(FinalizationResponse {
                final_text: final_text.to_string(),
                confidence: 0.97,
                duration: 2.0,
                words: None,
            }),
        }
    }

    fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait::async_trait]
impl Finalizer for MockFinalizer {
    async fn finalize(
        &self,
        _request: &FinalizationRequest,
    ) -> Result<FinalizationResponse, DictationError> {
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(DictationError::Finalization(
                "endpoint timed out".to_string(),
            )),
        }
    }
}

/// Mock transcription service: acknowledges the session, then replays the
/// scripted messages once the given number of audio frames has arrived.
async fn spawn_mock_service(
    directives: Vec<(usize, ServerMessage)>,
    ack_terminate: bool,
    drop_after_frames: Option<usize>,
) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };

        let begin = ServerMessage::SessionBegins {
            session_id: "mock-session-1".to_string(),
            expires_at: "2026-01-01T00:00:00Z".to_string(),
        };
        if ws
            .send(Message::Text(serde_json::to_string(&begin).unwrap()))
            .await
            .is_err()
        {
            return;
        }

        let mut pending = directives;
        let mut frames = 0usize;

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                    if value.get("terminate_session").is_some() {
                        if ack_terminate {
                            let terminated = ServerMessage::SessionTerminated {
                                audio_duration_seconds: 2.0,
                            };
                            let _ = ws
                                .send(Message::Text(
                                    serde_json::to_string(&terminated).unwrap(),
                                ))
                                .await;
                            let _ = ws.close(None).await;
                            return;
                        }
                        // Never acknowledge; the client must force-close.
                    } else if value.get("audio_data").is_some() {
                        frames += 1;
                        if let Some(n) = drop_after_frames {
                            if frames >= n {
                                // Abrupt transport drop, no close frame
                                return;
                            }
                        }
                        while let Some((n, _)) = pending.first() {
                            if *n <= frames {
                                let (_, message) = pending.remove(0);
                                let _ = ws
                                    .send(Message::Text(
                                        serde_json::to_string(&message).unwrap(),
                                    ))
                                    .await;
                            } else {
                                break;
                            }
                        }
                    }
                }
                Message::Close(_) => return,
                _ => {}
            }
        }
    });

    url
}

fn partial(text: &str, audio_end: u64) -> ServerMessage {
    ServerMessage::PartialTranscript {
        transcript: TranscriptPayload {
            text: text.to_string(),
            confidence: 0.55,
            audio_start: 0,
            audio_end,
            words: Vec::new(),
        },
    }
}

fn final_fragment(text: &str, audio_end: u64) -> ServerMessage {
    ServerMessage::FinalTranscript {
        transcript: TranscriptPayload {
            text: text.to_string(),
            confidence: 0.92,
            audio_start: 0,
            audio_end,
            words: Vec::new(),
        },
    }
}

fn make_session(url: &str, dir: &Path, finalizer: MockFinalizer) -> DictationSession {
    let capture_config = CaptureConfig::default();
    // 2 seconds of silence delivered as 8 buffers, one every 20ms
    let backend =
        ScriptedBackend::silence(&capture_config, 2000).with_pacing(Duration::from_millis(20));

    let config = SessionConfig {
        note_id: "note-test".to_string(),
        recordings_dir: dir.to_path_buf(),
        terminate_timeout: Duration::from_millis(500),
        ..Default::default()
    };

    DictationSession::new(
        config,
        Box::new(backend),
        Arc::new(StaticTokens),
        Arc::new(finalizer),
        StreamingConfig {
            endpoint: url.to_string(),
            sample_rate: 16000,
            handshake_timeout: Duration::from_secs(2),
        },
    )
}

async fn wait_for_combined(session: &DictationSession, needle: &str) {
    for _ in 0..300 {
        if session.combined_text().await.contains(needle) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "transcript never contained {:?}; got {:?}",
        needle,
        session.combined_text().await
    );
}

async fn wait_for_state(session: &DictationSession, expected: RecordingState) {
    for _ in 0..300 {
        if session.state().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "state never reached {}; stuck at {}",
        expected,
        session.state().await
    );
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_session_streams_reconciles_and_finalizes() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(
        vec![
            (2, partial("hello the", 900)),
            (3, final_fragment("Hello there.", 1200)),
        ],
        true,
        None,
    )
    .await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::success("Hello there, doctor."));

    session.start().await.unwrap();
    assert_eq!(session.session_id().await.as_deref(), Some("mock-session-1"));

    wait_for_combined(&session, "Hello there.").await;
    assert_eq!(session.state().await, RecordingState::Recognizing);

    let result = session.stop().await.unwrap();

    // The authoritative response supersedes the streamed draft
    assert!(!result.draft);
    assert_eq!(result.final_text, "Hello there, doctor.");
    assert!((result.confidence - 0.97).abs() < f32::EPSILON);
    assert_eq!(session.state().await, RecordingState::Done);

    let snapshot = session.snapshot().await;
    assert!(snapshot.ended_at.is_some());
    assert_eq!(snapshot.transcript.final_text, "Hello there.");

    // The take was written for finalization to re-process
    assert!(temp_dir.path().join("note-test-take.wav").exists());
}

#[tokio::test]
async fn test_finalization_failure_falls_back_to_draft() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(
        vec![(2, final_fragment("Hello there.", 1200))],
        true,
        None,
    )
    .await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::failing());

    session.start().await.unwrap();
    wait_for_combined(&session, "Hello there.").await;

    let result = session.stop().await.unwrap();

    // Losing the finalization endpoint must not lose dictated work
    assert!(result.draft);
    assert_eq!(result.final_text, "Hello there.");
    assert_eq!(session.state().await, RecordingState::Done);
}

#[tokio::test]
async fn test_transport_drop_preserves_draft_and_errors() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(
        vec![(1, partial("hello wor", 700))],
        false,
        Some(3),
    )
    .await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::success("unused"));

    session.start().await.unwrap();
    wait_for_combined(&session, "hello wor").await;
    wait_for_state(&session, RecordingState::Error).await;

    // Whatever was reconciled before the drop is kept for manual recovery
    assert_eq!(session.combined_text().await, "hello wor");

    // The session is dead; stop cannot finalize
    assert!(session.stop().await.is_err());
}

#[tokio::test]
async fn test_start_twice_is_a_noop() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(vec![], true, None).await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::success("ok"));

    session.start().await.unwrap();
    let state_before = session.state().await;

    // Second start: no-op, no error, no state change
    session.start().await.unwrap();
    assert_eq!(session.state().await, state_before);
    assert_eq!(session.session_id().await.as_deref(), Some("mock-session-1"));
}

#[tokio::test]
async fn test_cancel_resets_to_idle() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(vec![(1, partial("hel", 300))], true, None).await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::success("unused"));

    session.start().await.unwrap();
    wait_for_combined(&session, "hel").await;

    session.cancel().await;
    assert_eq!(session.state().await, RecordingState::Idle);
}

#[tokio::test]
async fn test_terminate_timeout_is_a_degraded_stop() {
    let temp_dir = TempDir::new().unwrap();
    // The service commits one final but never acknowledges termination
    let url = spawn_mock_service(
        vec![(1, final_fragment("Short note.", 500))],
        false,
        None,
    )
    .await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::failing());

    session.start().await.unwrap();
    wait_for_combined(&session, "Short note.").await;

    // stop() force-closes after the terminate timeout and still resolves
    let result = session.stop().await.unwrap();
    assert!(result.draft);
    assert_eq!(result.final_text, "Short note.");
    assert!(result.duration_seconds > 0.0, "falls back to the take duration");
    assert_eq!(session.state().await, RecordingState::Done);
}

#[tokio::test]
async fn test_unavailable_microphone_fails_start() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(vec![], true, None).await;

    let config = SessionConfig {
        note_id: "note-test".to_string(),
        recordings_dir: temp_dir.path().to_path_buf(),
        ..Default::default()
    };
    let session = DictationSession::new(
        config,
        Box::new(ScriptedBackend::unavailable()),
        Arc::new(StaticTokens),
        Arc::new(MockFinalizer::success("unused")),
        StreamingConfig {
            endpoint: url,
            sample_rate: 16000,
            handshake_timeout: Duration::from_secs(2),
        },
    );

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, DictationError::CaptureUnavailable(_)));
    assert_eq!(session.state().await, RecordingState::Error);
}

#[tokio::test]
async fn test_observers_report_the_full_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_mock_service(
        vec![(1, final_fragment("Done.", 400))],
        true,
        None,
    )
    .await;

    let session = make_session(&url, temp_dir.path(), MockFinalizer::success("Done."));

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    session
        .on_state_change(move |from, to| {
            log.lock().unwrap().push((from, to));
        })
        .await;

    session.start().await.unwrap();
    wait_for_combined(&session, "Done.").await;
    session.stop().await.unwrap();

    use RecordingState::*;
    let transitions = seen.lock().unwrap().clone();
    assert_eq!(
        transitions,
        vec![
            (Idle, Listening),
            (Listening, Recognizing),
            (Recognizing, Processing),
            (Processing, Done),
        ]
    );
}
