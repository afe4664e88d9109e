use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub finalization: FinalizationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    /// Directory where per-session WAV takes are written
    #[serde(default = "default_recordings_path")]
    pub recordings_path: String,

    /// Capture sample rate (the transcription service expects 16kHz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count (1 = mono)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Capture buffer duration per callback, in milliseconds
    #[serde(default = "default_buffer_ms")]
    pub buffer_duration_ms: u64,

    /// Amplitude (0-100) at or above which a buffer counts as clipping
    #[serde(default = "default_clip_threshold")]
    pub clip_threshold: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            recordings_path: default_recordings_path(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_duration_ms: default_buffer_ms(),
            clip_threshold: default_clip_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    /// WebSocket endpoint of the streaming transcription service
    pub endpoint: String,

    /// HTTP endpoint issuing short-lived session tokens
    pub token_endpoint: String,

    /// Bound on connect + session-begin acknowledgment, in milliseconds
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Bound on the session-terminated acknowledgment, in milliseconds
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizationSettings {
    /// HTTP endpoint performing authoritative re-processing of the take
    pub endpoint: String,

    /// Request timeout, in milliseconds
    #[serde(default = "default_finalization_timeout_ms")]
    pub timeout_ms: u64,

    /// Request PII redaction during finalization
    #[serde(default)]
    pub medical_mode: bool,
}

fn default_recordings_path() -> String {
    "recordings".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_buffer_ms() -> u64 {
    250
}

fn default_clip_threshold() -> f32 {
    98.0
}

fn default_handshake_timeout_ms() -> u64 {
    5000
}

fn default_terminate_timeout_ms() -> u64 {
    3000
}

fn default_finalization_timeout_ms() -> u64 {
    10000
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
