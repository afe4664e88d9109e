pub mod client;
pub mod messages;
pub mod token;

pub use client::{SessionInfo, StreamEvent, StreamingClient, StreamingConfig};
pub use messages::{AudioMessage, ServerMessage, TerminateMessage, TranscriptPayload, Word};
pub use token::{HttpTokenProvider, SessionToken, TokenProvider};
