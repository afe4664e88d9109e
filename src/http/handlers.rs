use super::state::AppState;
use crate::finalize::{FinalizationResult, HttpFinalizer};
use crate::session::{DictationSession, SessionConfig};
use crate::stt::{HttpTokenProvider, StreamingConfig};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartDictationRequest {
    /// Optional note ID (if not provided, generate UUID)
    pub note_id: Option<String>,

    /// Override the configured medical-mode flag for this session
    pub medical_mode: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StartDictationResponse {
    pub note_id: String,
    pub session_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopDictationResponse {
    pub note_id: String,
    pub status: String,
    pub result: FinalizationResult,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /dictation/start
/// Start a new dictation session
pub async fn start_dictation(
    State(state): State<AppState>,
    Json(req): Json<StartDictationRequest>,
) -> impl IntoResponse {
    let note_id = req
        .note_id
        .unwrap_or_else(|| format!("note-{}", uuid::Uuid::new_v4()));

    info!("Starting dictation for note: {}", note_id);

    // Check if already dictating
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&note_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Note {} is already recording", note_id),
                }),
            )
                .into_response();
        }
    }

    let cfg = &state.config;
    let session_config = SessionConfig {
        note_id: note_id.clone(),
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        buffer_duration_ms: cfg.audio.buffer_duration_ms,
        clip_threshold: cfg.audio.clip_threshold,
        recordings_dir: PathBuf::from(&cfg.audio.recordings_path),
        medical_mode: req.medical_mode.unwrap_or(cfg.finalization.medical_mode),
        terminate_timeout: Duration::from_millis(cfg.transcription.terminate_timeout_ms),
    };
    let streaming = StreamingConfig {
        endpoint: cfg.transcription.endpoint.clone(),
        sample_rate: cfg.audio.sample_rate,
        handshake_timeout: Duration::from_millis(cfg.transcription.handshake_timeout_ms),
    };

    let session = Arc::new(DictationSession::new(
        session_config,
        (state.capture_factory)(),
        Arc::new(HttpTokenProvider::new(cfg.transcription.token_endpoint.clone())),
        Arc::new(HttpFinalizer::new(
            cfg.finalization.endpoint.clone(),
            Duration::from_millis(cfg.finalization.timeout_ms),
        )),
        streaming,
    ));

    if let Err(e) = session.start().await {
        error!("Failed to start dictation: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to start dictation: {}", e),
            }),
        )
            .into_response();
    }

    let session_id = session.session_id().await;

    // Store session
    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(note_id.clone(), session);
    }

    info!("Dictation started successfully for note: {}", note_id);

    (
        StatusCode::OK,
        Json(StartDictationResponse {
            note_id,
            session_id,
            status: "listening".to_string(),
        }),
    )
        .into_response()
}

/// POST /dictation/:note_id/stop
/// Stop dictating and resolve the note's definitive text
pub async fn stop_dictation(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping dictation for note: {}", note_id);

    // Find and remove session
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&note_id)
    };

    match session {
        Some(session) => match session.stop().await {
            Ok(result) => {
                info!("Dictation stopped successfully for note: {}", note_id);
                (
                    StatusCode::OK,
                    Json(StopDictationResponse {
                        note_id,
                        status: "done".to_string(),
                        result,
                    }),
                )
                    .into_response()
            }
            Err(e) => {
                error!("Failed to stop dictation: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to stop dictation: {}", e),
                    }),
                )
                    .into_response()
            }
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Note {} not found", note_id),
            }),
        )
            .into_response(),
    }
}

/// POST /dictation/:note_id/cancel
/// Hard cancel: tear down without finalization
pub async fn cancel_dictation(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&note_id)
    };

    match session {
        Some(session) => {
            session.cancel().await;
            info!("Dictation cancelled for note: {}", note_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Note {} not found", note_id),
            }),
        )
            .into_response(),
    }
}

/// GET /dictation/:note_id/status
/// Get a point-in-time snapshot of a session
pub async fn get_status(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&note_id) {
        Some(session) => (StatusCode::OK, Json(session.snapshot().await)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Note {} not found", note_id),
            }),
        )
            .into_response(),
    }
}

/// GET /dictation/:note_id/transcript
/// Get the live draft transcript (committed text + current partial)
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&note_id) {
        Some(session) => {
            (StatusCode::OK, Json(session.transcript_snapshot().await)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Note {} not found", note_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
