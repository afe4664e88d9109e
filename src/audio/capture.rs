use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use super::level::{self, MeteringSample, DEFAULT_CLIP_THRESHOLD};
use crate::error::DictationError;
use base64::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One captured buffer: the raw frame, its wire encoding, and its meter reading.
#[derive(Debug, Clone)]
pub struct CapturedBuffer {
    pub frame: AudioFrame,
    /// Base64-encoded little-endian PCM16, ready for transmission
    pub pcm_base64: String,
    pub metering: MeteringSample,
}

/// Capture adapter over a microphone backend.
///
/// Emits one `CapturedBuffer` per backend callback (~250ms of audio each) on
/// the channel handed to `start`. Buffer cadence is set by the backend, not
/// the caller.
pub struct AudioCapture {
    backend: Box<dyn CaptureBackend>,
    config: CaptureConfig,
    clip_threshold: f32,
    initialized: bool,
    active: Arc<AtomicBool>,
    forward_task: Option<JoinHandle<()>>,
}

impl AudioCapture {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            config: CaptureConfig::default(),
            clip_threshold: DEFAULT_CLIP_THRESHOLD,
            initialized: false,
            active: Arc::new(AtomicBool::new(false)),
            forward_task: None,
        }
    }

    /// Configure sample rate, channel count, and buffer sizing.
    ///
    /// Idempotent: a second call while initialized is a no-op.
    pub fn initialize(&mut self, config: CaptureConfig, clip_threshold: f32) {
        if self.initialized {
            warn!("capture already initialized; ignoring");
            return;
        }
        self.config = config;
        self.clip_threshold = clip_threshold;
        self.initialized = true;
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Begin capture, forwarding every buffer to `tx`.
    pub async fn start(
        &mut self,
        tx: mpsc::Sender<CapturedBuffer>,
    ) -> Result<(), DictationError> {
        if self.active.load(Ordering::SeqCst) {
            warn!("capture already started; ignoring");
            return Ok(());
        }

        let mut frames = self.backend.start().await?;
        self.active.store(true, Ordering::SeqCst);
        info!("audio capture started ({})", self.backend.name());

        let active = Arc::clone(&self.active);
        let clip_threshold = self.clip_threshold;
        let task = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if !active.load(Ordering::SeqCst) {
                    break;
                }

                let pcm_bytes: Vec<u8> = frame
                    .samples
                    .iter()
                    .flat_map(|s| s.to_le_bytes())
                    .collect();
                let pcm_base64 = base64::engine::general_purpose::STANDARD.encode(&pcm_bytes);
                let metering = level::analyze(&pcm_base64, clip_threshold);

                let buffer = CapturedBuffer {
                    frame,
                    pcm_base64,
                    metering,
                };
                if tx.send(buffer).await.is_err() {
                    break;
                }
            }
            info!("audio capture task stopped");
        });
        self.forward_task = Some(task);

        Ok(())
    }

    /// Halt capture and release the hardware. Idempotent.
    pub async fn stop(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.backend.stop().await {
            warn!("failed to stop capture backend: {}", e);
        }
        if let Some(task) = self.forward_task.take() {
            if let Err(e) = task.await {
                warn!("capture task panicked: {}", e);
            }
        }
        info!("audio capture stopped");
    }

    /// Unconditionally stop capture and drop the forwarding task.
    ///
    /// Safe to call from any state, including before `start`.
    pub async fn cleanup(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Err(e) = self.backend.stop().await {
            warn!("failed to stop capture backend during cleanup: {}", e);
        }
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
