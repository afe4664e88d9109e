use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::backend::AudioFrame;

/// Metadata for a finished take
#[derive(Debug, Clone)]
pub struct TakeMetadata {
    /// File path of the WAV take
    pub file_path: PathBuf,
    /// Sample rate
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Number of samples written
    pub sample_count: usize,
}

impl TakeMetadata {
    /// Audio duration of the take in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Writes one WAV take per dictation session
///
/// The finished file is the audio reference handed to finalization for
/// authoritative re-processing.
pub struct TakeRecorder {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    metadata: TakeMetadata,
}

impl TakeRecorder {
    pub fn new(
        output_dir: &Path,
        note_id: &str,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        fs::create_dir_all(output_dir).context("Failed to create recordings directory")?;

        let file_path = output_dir.join(format!("{}-take.wav", note_id));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        info!("recording take to {:?}", file_path);

        Ok(Self {
            writer: Some(writer),
            metadata: TakeMetadata {
                file_path,
                sample_rate,
                channels,
                sample_count: 0,
            },
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.metadata.sample_count += frame.samples.len();
        }
        Ok(())
    }

    pub fn duration_seconds(&self) -> f64 {
        self.metadata.duration_seconds()
    }

    pub fn finish(mut self) -> Result<TakeMetadata> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }
        info!(
            "take complete: {:?} ({:.1}s)",
            self.metadata.file_path,
            self.metadata.duration_seconds()
        );
        Ok(self.metadata.clone())
    }
}

impl Drop for TakeRecorder {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
