use crate::error::DictationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Buffer duration per callback (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // The transcription service expects 16kHz
            channels: 1,        // Mono
            buffer_duration_ms: 250,
        }
    }
}

impl CaptureConfig {
    /// Samples per emitted buffer at this rate and duration.
    pub fn samples_per_buffer(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_duration_ms / 1000) as usize
            * self.channels as usize
    }
}

/// Microphone capture backend trait
///
/// The platform microphone is an external collaborator; the embedding
/// application binds its audio stack through this seam. `ScriptedBackend`
/// provides a deterministic in-process source for tests and headless runs.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. Fails with
    /// `CaptureUnavailable` when permission is missing or the hardware is busy.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, DictationError>;

    /// Stop capturing audio and release the hardware
    async fn stop(&mut self) -> Result<(), DictationError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Deterministic capture backend fed from a prepared frame list.
pub struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    pacing: Option<Duration>,
    available: bool,
    capturing: Arc<AtomicBool>,
    feed_task: Option<JoinHandle<()>>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            pacing: None,
            available: true,
            capturing: Arc::new(AtomicBool::new(false)),
            feed_task: None,
        }
    }

    /// Sleep this long between frames instead of delivering them all at once.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// A backend that refuses to start, as a denied or busy microphone would.
    pub fn unavailable() -> Self {
        let mut backend = Self::new(Vec::new());
        backend.available = false;
        backend
    }

    /// Silence frames covering `total_ms` of audio at the configured buffer size.
    pub fn silence(config: &CaptureConfig, total_ms: u64) -> Self {
        let samples_per_buffer = config.samples_per_buffer();
        let buffers = (total_ms / config.buffer_duration_ms.max(1)) as usize;
        let frames = (0..buffers)
            .map(|i| AudioFrame {
                samples: vec![0i16; samples_per_buffer],
                sample_rate: config.sample_rate,
                channels: config.channels,
                timestamp_ms: i as u64 * config.buffer_duration_ms,
            })
            .collect();
        Self::new(frames)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, DictationError> {
        if !self.available {
            return Err(DictationError::CaptureUnavailable(
                "scripted backend marked unavailable".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let frames = std::mem::take(&mut self.frames);
        let pacing = self.pacing;
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            for frame in frames {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
                if let Some(delay) = pacing {
                    tokio::time::sleep(delay).await;
                }
            }
            capturing.store(false, Ordering::SeqCst);
        });
        self.feed_task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DictationError> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
