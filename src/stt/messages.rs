use serde::{Deserialize, Serialize};

/// One recognized word with millisecond timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: u64,
    pub end: u64,
    pub confidence: f32,
}

/// Transcript fragment payload shared by partial and final messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptPayload {
    pub text: String,
    pub confidence: f32,
    /// Start of the covered audio span, ms
    pub audio_start: u64,
    /// End of the covered audio span, ms
    pub audio_end: u64,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Incoming service message, tagged by `message_type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum ServerMessage {
    /// Session acknowledged; carries the service-assigned id and token expiry
    SessionBegins {
        session_id: String,
        expires_at: String,
    },
    /// Interim fragment; a full redraft of the uncommitted tail
    PartialTranscript {
        #[serde(flatten)]
        transcript: TranscriptPayload,
    },
    /// Committed fragment; never revised by a later message
    FinalTranscript {
        #[serde(flatten)]
        transcript: TranscriptPayload,
    },
    /// Graceful closure acknowledgment with total audio duration
    SessionTerminated { audio_duration_seconds: f64 },
    Error { error: String },
}

/// Outgoing audio frame (base64 PCM16 mono 16kHz)
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioMessage<'a> {
    pub audio_data: &'a str,
}

/// Outgoing graceful-closure request
#[derive(Debug, Serialize, Deserialize)]
pub struct TerminateMessage {
    pub terminate_session: bool,
}
