use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one dictation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identifier of the treatment note this dictation attaches to
    pub note_id: String,

    /// Capture sample rate (the transcription service expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Capture buffer duration per callback
    pub buffer_duration_ms: u64,

    /// Amplitude (0-100) at or above which a buffer meters as clipping
    pub clip_threshold: f32,

    /// Directory for the session's WAV take
    pub recordings_dir: PathBuf,

    /// Request PII redaction during finalization
    pub medical_mode: bool,

    /// Bound on the session-terminated acknowledgment at stop
    pub terminate_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            note_id: format!("note-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 250,
            clip_threshold: 98.0,
            recordings_dir: PathBuf::from("recordings"),
            medical_mode: false,
            terminate_timeout: Duration::from_secs(3),
        }
    }
}
