//! HTTP control surface for the note-editing UI
//!
//! Start/stop/cancel dictation sessions and read the live draft transcript.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, CaptureFactory};
