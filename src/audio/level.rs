use base64::Engine;
use serde::Serialize;

/// Decibel floor reported for silent or undecodable buffers.
pub const DB_FLOOR: f32 = -160.0;

/// Default amplitude at or above which a buffer counts as clipping.
pub const DEFAULT_CLIP_THRESHOLD: f32 = 98.0;

// Typical speech RMS sits far below full scale; this gain maps it onto a
// usable 0-100 meter range before clamping.
const RMS_GAIN: f32 = 300.0;

/// One loudness reading per captured buffer, consumed by UI metering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeteringSample {
    /// Normalized loudness, 0-100
    pub amplitude: f32,
    /// Decibel estimate, -160..0
    pub db: f32,
    /// Amplitude at or near the instrument's ceiling
    pub is_clipping: bool,
}

impl MeteringSample {
    pub fn silence() -> Self {
        Self {
            amplitude: 0.0,
            db: DB_FLOOR,
            is_clipping: false,
        }
    }
}

/// Meter one base64-encoded little-endian PCM16 buffer.
///
/// Decoding failures never surface to the caller; a malformed buffer meters
/// as silence.
pub fn analyze(pcm_base64: &str, clip_threshold: f32) -> MeteringSample {
    match base64::engine::general_purpose::STANDARD.decode(pcm_base64) {
        Ok(bytes) => analyze_pcm(&bytes, clip_threshold),
        Err(_) => MeteringSample::silence(),
    }
}

/// Meter one raw little-endian PCM16 buffer.
pub fn analyze_pcm(bytes: &[u8], clip_threshold: f32) -> MeteringSample {
    if bytes.len() < 2 {
        return MeteringSample::silence();
    }

    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    for chunk in bytes.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        let normalized = sample as f64 / 32768.0;
        sum_squares += normalized * normalized;
        count += 1;
    }

    let rms = (sum_squares / count as f64).sqrt() as f32;
    let amplitude = (rms * RMS_GAIN).min(100.0);
    let db = if amplitude > 0.0 {
        (20.0 * (amplitude / 100.0).log10()).clamp(DB_FLOOR, 0.0)
    } else {
        DB_FLOOR
    };

    MeteringSample {
        amplitude,
        db,
        is_clipping: amplitude >= clip_threshold,
    }
}
