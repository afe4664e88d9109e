use thiserror::Error;

/// Error taxonomy for the dictation pipeline.
///
/// Capture and session-start failures abort the attempt; the caller retries
/// with a fresh session. Transport failures preserve whatever transcript was
/// reconciled so far. Finalization failures are recovered locally by falling
/// back to the streamed draft.
#[derive(Debug, Error)]
pub enum DictationError {
    /// Microphone permission not granted or hardware busy.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// Token fetch failed or the session-begin acknowledgment never arrived.
    #[error("session start failed: {0}")]
    SessionStart(String),

    /// The transcription connection failed mid-session.
    #[error("transport error: {0}")]
    Transport(String),

    /// The finalization endpoint failed; callers fall back to the draft.
    #[error("finalization failed: {0}")]
    Finalization(String),
}
