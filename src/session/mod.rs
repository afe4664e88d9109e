//! Dictation session management
//!
//! This module provides the `DictationSession` abstraction that manages:
//! - Microphone capture and level metering
//! - Streaming audio to the transcription service
//! - Partial/final transcript reconciliation
//! - The recording state machine driving the UI
//! - Stop-time finalization with draft fallback

mod config;
mod events;
mod session;
mod state;

pub use config::SessionConfig;
pub use events::{SessionCommand, SessionEvent};
pub use session::{DictationSession, SessionSnapshot};
pub use state::{InvalidTransition, RecordingState, StateMachine};
