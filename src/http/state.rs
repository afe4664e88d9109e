use crate::audio::CaptureBackend;
use crate::config::Config;
use crate::session::DictationSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Constructs a capture backend for each new session.
///
/// The embedding application registers its platform microphone here; headless
/// runs use a scripted source.
pub type CaptureFactory = Arc<dyn Fn() -> Box<dyn CaptureBackend> + Send + Sync>;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active dictation sessions (note_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<DictationSession>>>>,

    /// Service configuration
    pub config: Arc<Config>,

    /// Capture backend factory
    pub capture_factory: CaptureFactory,
}

impl AppState {
    pub fn new(config: Arc<Config>, capture_factory: CaptureFactory) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
            capture_factory,
        }
    }
}
