pub mod audio;
pub mod config;
pub mod error;
pub mod finalize;
pub mod http;
pub mod session;
pub mod stt;
pub mod transcript;

pub use audio::{
    AudioCapture, AudioFrame, CaptureBackend, CaptureConfig, CapturedBuffer, MeteringSample,
    ScriptedBackend, TakeMetadata, TakeRecorder,
};
pub use config::Config;
pub use error::DictationError;
pub use finalize::{
    FinalizationRequest, FinalizationResponse, FinalizationResult, Finalizer, HttpFinalizer,
};
pub use http::{create_router, AppState, CaptureFactory};
pub use session::{
    DictationSession, InvalidTransition, RecordingState, SessionConfig, SessionSnapshot,
    StateMachine,
};
pub use stt::{
    HttpTokenProvider, ServerMessage, SessionToken, StreamingClient, StreamingConfig,
    TokenProvider, TranscriptPayload, Word,
};
pub use transcript::{TranscriptSnapshot, TranscriptState};
