pub mod backend;
pub mod capture;
pub mod level;
pub mod recorder;

pub use backend::{AudioFrame, CaptureBackend, CaptureConfig, ScriptedBackend};
pub use capture::{AudioCapture, CapturedBuffer};
pub use level::{MeteringSample, DB_FLOOR, DEFAULT_CLIP_THRESHOLD};
pub use recorder::{TakeMetadata, TakeRecorder};
