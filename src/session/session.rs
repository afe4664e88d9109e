use super::config::SessionConfig;
use super::events::{SessionCommand, SessionEvent};
use super::state::{RecordingState, StateMachine};
use crate::audio::{
    AudioCapture, CaptureBackend, CaptureConfig, CapturedBuffer, MeteringSample, TakeRecorder,
};
use crate::error::DictationError;
use crate::finalize::{self, FinalizationRequest, FinalizationResult, Finalizer};
use crate::stt::{ServerMessage, StreamEvent, StreamingClient, StreamingConfig, TokenProvider};
use crate::transcript::{TranscriptSnapshot, TranscriptState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tracing::{debug, error, info, warn};

/// Point-in-time view of a session for the control API
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub note_id: String,
    pub session_id: Option<String>,
    pub state: RecordingState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub transcript: TranscriptSnapshot,
}

/// One microphone-to-transcript lifecycle.
///
/// Owned per dictation: constructed when recording starts being set up,
/// discarded at teardown. Capture and transport run on their own tasks but
/// only ever push tagged events into one queue; a single consumer task owns
/// the reconciler, the WAV take, the state machine, and the connection's
/// write half, so shared state is never mutated concurrently.
pub struct DictationSession {
    config: SessionConfig,
    streaming: StreamingConfig,
    backend: Mutex<Option<Box<dyn CaptureBackend>>>,
    tokens: Arc<dyn TokenProvider>,
    finalizer: Arc<dyn Finalizer>,

    state: Arc<Mutex<StateMachine>>,
    transcript: Arc<Mutex<TranscriptState>>,
    session_id: Arc<Mutex<Option<String>>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    metering_tx: Arc<watch::Sender<MeteringSample>>,

    events_tx: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    worker_task: Mutex<Option<JoinHandle<()>>>,
}

impl DictationSession {
    pub fn new(
        config: SessionConfig,
        backend: Box<dyn CaptureBackend>,
        tokens: Arc<dyn TokenProvider>,
        finalizer: Arc<dyn Finalizer>,
        streaming: StreamingConfig,
    ) -> Self {
        let (metering_tx, _) = watch::channel(MeteringSample::silence());
        Self {
            config,
            streaming,
            backend: Mutex::new(Some(backend)),
            tokens,
            finalizer,
            state: Arc::new(Mutex::new(StateMachine::new())),
            transcript: Arc::new(Mutex::new(TranscriptState::new())),
            session_id: Arc::new(Mutex::new(None)),
            started_at: Mutex::new(None),
            metering_tx: Arc::new(metering_tx),
            events_tx: Mutex::new(None),
            worker_task: Mutex::new(None),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.config.note_id
    }

    /// Begin capturing and streaming.
    ///
    /// A second call while the session is past `idle` is a no-op. Failures
    /// transition to `error`; retry means a fresh session, never a resume.
    pub async fn start(&self) -> Result<(), DictationError> {
        {
            let mut machine = self.state.lock().await;
            if machine.current() != RecordingState::Idle {
                warn!("start() ignored: session already {}", machine.current());
                return Ok(());
            }
            if machine.transition(RecordingState::Listening).is_err() {
                return Ok(());
            }
        }
        *self.started_at.lock().await = Some(Utc::now());

        info!("starting dictation session for note {}", self.config.note_id);

        let backend = match self.backend.lock().await.take() {
            Some(backend) => backend,
            None => {
                self.fail_start().await;
                return Err(DictationError::CaptureUnavailable(
                    "session already consumed its capture backend".to_string(),
                ));
            }
        };
        let mut capture = AudioCapture::new(backend);
        capture.initialize(
            CaptureConfig {
                sample_rate: self.config.sample_rate,
                channels: self.config.channels,
                buffer_duration_ms: self.config.buffer_duration_ms,
            },
            self.config.clip_threshold,
        );

        let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(256);

        // Open the connection before capture so no audio is dropped.
        let mut client = StreamingClient::new(self.streaming.clone());
        let (stt_tx, mut stt_rx) = mpsc::channel::<StreamEvent>(64);
        let session_info = match client.begin(self.tokens.as_ref(), stt_tx).await {
            Ok(session_info) => session_info,
            Err(e) => {
                error!("failed to begin transcription session: {}", e);
                client.force_close().await;
                self.fail_start().await;
                return Err(e);
            }
        };
        *self.session_id.lock().await = Some(session_info.session_id);

        let stt_fwd = events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = stt_rx.recv().await {
                let tagged = match event {
                    StreamEvent::Message(message) => SessionEvent::Transcript(message),
                    StreamEvent::Closed { reason } => SessionEvent::TransportClosed { reason },
                };
                if stt_fwd.send(tagged).await.is_err() {
                    break;
                }
            }
        });

        // The WAV take is the audio reference finalization re-processes.
        let recorder = match TakeRecorder::new(
            &self.config.recordings_dir,
            &self.config.note_id,
            self.config.sample_rate,
            self.config.channels,
        ) {
            Ok(recorder) => recorder,
            Err(e) => {
                error!("failed to open session take: {}", e);
                client.force_close().await;
                self.fail_start().await;
                return Err(DictationError::SessionStart(format!(
                    "take recorder: {}",
                    e
                )));
            }
        };

        let (capture_tx, mut capture_rx) = mpsc::channel::<CapturedBuffer>(64);
        if let Err(e) = capture.start(capture_tx).await {
            error!("capture failed to start: {}", e);
            client.force_close().await;
            self.fail_start().await;
            return Err(e);
        }
        let capture_fwd = events_tx.clone();
        tokio::spawn(async move {
            while let Some(buffer) = capture_rx.recv().await {
                if capture_fwd.send(SessionEvent::Audio(buffer)).await.is_err() {
                    break;
                }
            }
        });

        *self.events_tx.lock().await = Some(events_tx);

        let worker = SessionWorker {
            events: events_rx,
            capture,
            client,
            recorder: Some(recorder),
            state: Arc::clone(&self.state),
            transcript: Arc::clone(&self.transcript),
            metering: Arc::clone(&self.metering_tx),
            finalizer: Arc::clone(&self.finalizer),
            medical_mode: self.config.medical_mode,
            terminate_timeout: self.config.terminate_timeout,
        };
        let handle = tokio::spawn(worker.run());
        *self.worker_task.lock().await = Some(handle);

        Ok(())
    }

    /// Stop dictating and resolve the note's definitive text.
    ///
    /// Capture halts immediately; the terminate handshake and finalization
    /// happen afterwards. Finalization failure still yields a result (the
    /// draft, flagged) — dictated work is never discarded at this step.
    pub async fn stop(&self) -> Result<FinalizationResult, DictationError> {
        let sender = self.events_tx.lock().await.clone();
        let Some(sender) = sender else {
            return Err(DictationError::Transport(
                "session has not been started".to_string(),
            ));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(SessionEvent::Command(SessionCommand::Stop {
                reply: reply_tx,
            }))
            .await
            .map_err(|_| DictationError::Transport("session is no longer active".to_string()))?;

        let result = reply_rx.await.map_err(|_| {
            DictationError::Transport("session ended before finalization".to_string())
        })?;

        if let Some(task) = self.worker_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("session worker panicked: {}", e);
            }
        }

        Ok(result)
    }

    /// Hard cancel: stop capture, drop the connection, discard pending
    /// callbacks without invoking them, and reset to `idle`.
    pub async fn cancel(&self) {
        let sender = self.events_tx.lock().await.clone();
        if let Some(sender) = sender {
            if sender
                .send(SessionEvent::Command(SessionCommand::Cancel))
                .await
                .is_ok()
            {
                if let Some(task) = self.worker_task.lock().await.take() {
                    if let Err(e) = task.await {
                        error!("session worker panicked: {}", e);
                    }
                }
                return;
            }
        }
        // Never started, or the worker is already gone.
        self.state.lock().await.reset();
    }

    pub async fn state(&self) -> RecordingState {
        self.state.lock().await.current()
    }

    /// Service-assigned session id; `None` before the session begins.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    /// The live draft: committed text plus the current partial.
    pub async fn combined_text(&self) -> String {
        self.transcript.lock().await.combined_text()
    }

    pub async fn transcript_snapshot(&self) -> TranscriptSnapshot {
        self.transcript.lock().await.snapshot()
    }

    /// Latest loudness reading, one per captured buffer.
    pub fn metering(&self) -> watch::Receiver<MeteringSample> {
        self.metering_tx.subscribe()
    }

    /// Register a state observer. Observers run synchronously on every
    /// transition, in transition order.
    pub async fn on_state_change(
        &self,
        observer: impl Fn(RecordingState, RecordingState) + Send + 'static,
    ) {
        self.state.lock().await.observe(observer);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let (state, ended_at) = {
            let machine = self.state.lock().await;
            (machine.current(), machine.ended_at())
        };
        let started_at = *self.started_at.lock().await;
        let duration_secs = started_at
            .map(|s| {
                (ended_at.unwrap_or_else(Utc::now) - s).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        SessionSnapshot {
            note_id: self.config.note_id.clone(),
            session_id: self.session_id.lock().await.clone(),
            state,
            started_at,
            ended_at,
            duration_secs,
            transcript: self.transcript.lock().await.snapshot(),
        }
    }

    async fn fail_start(&self) {
        let _ = self
            .state
            .lock()
            .await
            .transition(RecordingState::Error);
    }
}

/// The single consumer of session events.
///
/// Owns everything mutable: the capture adapter, the connection's write half,
/// the WAV take, the reconciler, and the state machine handle. Events are
/// processed in strict arrival order.
struct SessionWorker {
    events: mpsc::Receiver<SessionEvent>,
    capture: AudioCapture,
    client: StreamingClient,
    recorder: Option<TakeRecorder>,
    state: Arc<Mutex<StateMachine>>,
    transcript: Arc<Mutex<TranscriptState>>,
    metering: Arc<watch::Sender<MeteringSample>>,
    finalizer: Arc<dyn Finalizer>,
    medical_mode: bool,
    terminate_timeout: Duration,
}

impl SessionWorker {
    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Audio(buffer) => {
                    if self.on_audio(buffer).await.is_err() {
                        return;
                    }
                }
                SessionEvent::Transcript(message) => {
                    if self.on_transcript(message).await.is_err() {
                        return;
                    }
                }
                SessionEvent::TransportClosed { reason } => {
                    self.fail_transport(
                        reason.unwrap_or_else(|| "connection closed".to_string()),
                    )
                    .await;
                    return;
                }
                SessionEvent::Command(SessionCommand::Stop { reply }) => {
                    self.shutdown(reply).await;
                    return;
                }
                SessionEvent::Command(SessionCommand::Cancel) => {
                    self.cancel().await;
                    return;
                }
            }
        }
    }

    async fn on_audio(&mut self, buffer: CapturedBuffer) -> Result<(), ()> {
        self.metering.send_replace(buffer.metering);

        if let Some(recorder) = &mut self.recorder {
            if let Err(e) = recorder.write_frame(&buffer.frame) {
                warn!("failed to append to take: {}", e);
            }
        }

        let state = self.state.lock().await.current();
        if matches!(
            state,
            RecordingState::Listening | RecordingState::Recognizing
        ) {
            if let Err(e) = self.client.send_audio(&buffer.pcm_base64).await {
                self.fail_transport(e.to_string()).await;
                return Err(());
            }
        }
        Ok(())
    }

    async fn on_transcript(&mut self, message: ServerMessage) -> Result<(), ()> {
        match message {
            ServerMessage::PartialTranscript { transcript } => {
                self.mark_recognizing().await;
                let mut state = self.transcript.lock().await;
                if !state.apply_partial(&transcript.text, transcript.audio_end) {
                    debug!("discarded stale partial covering committed audio");
                }
            }
            ServerMessage::FinalTranscript { transcript } => {
                self.mark_recognizing().await;
                self.transcript
                    .lock()
                    .await
                    .apply_final(&transcript.text, transcript.audio_end);
            }
            ServerMessage::SessionTerminated { .. } => {
                warn!("unexpected session-terminated before stop");
            }
            ServerMessage::Error { error } => {
                self.fail_transport(format!("service error: {}", error)).await;
                return Err(());
            }
            ServerMessage::SessionBegins { session_id, .. } => {
                warn!("duplicate session-begin for {}", session_id);
            }
        }
        Ok(())
    }

    /// The first fragment moves the session from listening to recognizing.
    async fn mark_recognizing(&self) {
        let mut machine = self.state.lock().await;
        if machine.current() == RecordingState::Listening {
            let _ = machine.transition(RecordingState::Recognizing);
        }
    }

    /// Mid-session transport failure: stop capture, drop the connection,
    /// transition to `error`. The reconciled transcript is left intact for
    /// manual recovery; retry means a fresh session.
    async fn fail_transport(&mut self, reason: String) {
        error!("transcription transport failed: {}", reason);
        self.capture.stop().await;
        self.client.force_close().await;
        let _ = self
            .state
            .lock()
            .await
            .transition(RecordingState::Error);
    }

    async fn shutdown(mut self, reply: oneshot::Sender<FinalizationResult>) {
        // The microphone stops immediately; finalization may still be pending.
        self.capture.stop().await;
        {
            let _ = self
                .state
                .lock()
                .await
                .transition(RecordingState::Processing);
        }

        let mut reported_duration = None;
        if self.client.is_open() {
            if let Err(e) = self.client.send_terminate().await {
                warn!("terminate request failed: {}", e);
            } else {
                reported_duration = self.drain_until_terminated().await;
            }
            self.client.force_close().await;
        }

        let take = match self.recorder.take() {
            Some(recorder) => match recorder.finish() {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!("failed to finish take: {}", e);
                    None
                }
            },
            None => None,
        };

        let draft = self.transcript.lock().await.combined_text();
        let fallback_duration = reported_duration
            .or_else(|| take.as_ref().map(|t| t.duration_seconds()))
            .unwrap_or(0.0);
        let audio_uri = take
            .as_ref()
            .map(|t| format!("file://{}", t.file_path.display()))
            .unwrap_or_default();

        let request = FinalizationRequest {
            audio_uri,
            streaming_transcript: draft,
            medical_mode: self.medical_mode,
        };
        let result = finalize::resolve(self.finalizer.as_ref(), &request, fallback_duration).await;

        let _ = self.state.lock().await.transition(RecordingState::Done);
        let _ = reply.send(result);
    }

    /// Drain events until the service acknowledges termination.
    ///
    /// Late final commits still land in the draft; a timeout or transport
    /// drop here is a degraded-but-successful stop.
    async fn drain_until_terminated(&mut self) -> Option<f64> {
        let deadline = tokio::time::Instant::now() + self.terminate_timeout;
        loop {
            let event = match timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => return None,
                Err(_) => {
                    warn!("timed out waiting for session-terminated; degraded stop");
                    return None;
                }
            };

            match event {
                SessionEvent::Transcript(ServerMessage::FinalTranscript { transcript }) => {
                    self.transcript
                        .lock()
                        .await
                        .apply_final(&transcript.text, transcript.audio_end);
                }
                SessionEvent::Transcript(ServerMessage::SessionTerminated {
                    audio_duration_seconds,
                }) => {
                    info!(
                        "session terminated by service ({:.1}s of audio)",
                        audio_duration_seconds
                    );
                    return Some(audio_duration_seconds);
                }
                SessionEvent::TransportClosed { .. } => return None,
                SessionEvent::Audio(buffer) => {
                    // Capture tail after stop: kept in the take, never sent.
                    if let Some(recorder) = &mut self.recorder {
                        let _ = recorder.write_frame(&buffer.frame);
                    }
                }
                SessionEvent::Command(SessionCommand::Stop { .. }) => {
                    warn!("stop() called while already stopping");
                }
                SessionEvent::Command(SessionCommand::Cancel) => {
                    warn!("cancel() ignored during stop");
                }
                SessionEvent::Transcript(_) => {}
            }
        }
    }

    async fn cancel(mut self) {
        info!("dictation session cancelled");
        self.capture.cleanup().await;
        self.client.force_close().await;
        self.recorder.take();
        self.state.lock().await.reset();
    }
}
