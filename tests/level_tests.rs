// Unit tests for the amplitude/level analyzer
//
// These verify the metering formulas against known PCM buffers: silence,
// full-scale, speech-level signals, and undecodable input.

use base64::Engine;
use scriven::audio::level::{analyze, analyze_pcm, DB_FLOOR, DEFAULT_CLIP_THRESHOLD};

fn encode(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[test]
fn test_all_zero_buffer_meters_as_silence() {
    let pcm = encode(&[0i16; 4000]);
    let sample = analyze(&pcm, DEFAULT_CLIP_THRESHOLD);

    assert_eq!(sample.amplitude, 0.0);
    assert_eq!(sample.db, DB_FLOOR);
    assert!(!sample.is_clipping);
}

#[test]
fn test_full_scale_buffer_clamps_and_clips() {
    let pcm = encode(&[32767i16; 4000]);
    let sample = analyze(&pcm, DEFAULT_CLIP_THRESHOLD);

    assert_eq!(sample.amplitude, 100.0, "amplitude should clamp to 100");
    assert!(sample.db > -0.01, "full scale should sit at the 0 dB ceiling");
    assert!(sample.db <= 0.0);
    assert!(sample.is_clipping);
}

#[test]
fn test_speech_level_buffer() {
    // Constant 10% of full scale: RMS 0.1, amplitude 30 after gain
    let pcm = encode(&[3277i16; 4000]);
    let sample = analyze(&pcm, DEFAULT_CLIP_THRESHOLD);

    assert!((sample.amplitude - 30.0).abs() < 0.5, "got {}", sample.amplitude);
    assert!(sample.db < 0.0);
    assert!(sample.db > DB_FLOOR);
    assert!(!sample.is_clipping);
}

#[test]
fn test_louder_buffer_meters_higher() {
    let quiet = analyze(&encode(&[500i16; 4000]), DEFAULT_CLIP_THRESHOLD);
    let loud = analyze(&encode(&[5000i16; 4000]), DEFAULT_CLIP_THRESHOLD);

    assert!(loud.amplitude > quiet.amplitude);
    assert!(loud.db > quiet.db);
}

#[test]
fn test_malformed_base64_meters_as_silence() {
    let sample = analyze("!!!not base64!!!", DEFAULT_CLIP_THRESHOLD);

    assert_eq!(sample.amplitude, 0.0);
    assert_eq!(sample.db, DB_FLOOR);
    assert!(!sample.is_clipping);
}

#[test]
fn test_empty_and_undersized_buffers_meter_as_silence() {
    assert_eq!(analyze("", DEFAULT_CLIP_THRESHOLD).amplitude, 0.0);
    assert_eq!(analyze_pcm(&[0x01], DEFAULT_CLIP_THRESHOLD).amplitude, 0.0);
}

#[test]
fn test_clip_threshold_is_configurable() {
    let pcm = encode(&[32767i16; 400]);

    // With an unreachable threshold, full scale no longer counts as clipping.
    let sample = analyze(&pcm, 150.0);
    assert_eq!(sample.amplitude, 100.0);
    assert!(!sample.is_clipping);
}

#[test]
fn test_db_is_clamped_to_floor_and_ceiling() {
    // A single tiny sample: amplitude is positive but far below the meter range
    let sample = analyze_pcm(&1i16.to_le_bytes(), DEFAULT_CLIP_THRESHOLD);

    assert!(sample.amplitude > 0.0);
    assert!(sample.db >= DB_FLOOR);
    assert!(sample.db <= 0.0);
}
