pub mod reconciler;

pub use reconciler::{TranscriptSnapshot, TranscriptState};
