//! Integration tests for tonescope-io WAV loading.

use tonescope_io::{
    SampleScale, WavSpec, read_wav, read_wav_channels, trim_edges, write_wav, write_wav_channels,
};
use tempfile::NamedTempFile;

/// Generate a sine wave at the given sample rate.
fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Mono
// ---------------------------------------------------------------------------

#[test]
fn wav_roundtrip_mono_f32() {
    let sr = 44100;
    let samples = sine_wave(sr, 1000.0, sr as usize, 0.8);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path(), SampleScale::Normalized).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded_spec.channels, 1);
    assert_eq!(loaded, samples);
}

#[test]
fn wav_roundtrip_mono_i16_normalized() {
    let sr = 48000;
    let samples = sine_wave(sr, 440.0, 4800, 0.5);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, _) = read_wav(file.path(), SampleScale::Normalized).unwrap();
    assert_eq!(loaded.len(), samples.len());
    for (a, b) in samples.iter().zip(&loaded) {
        assert!((a - b).abs() < 1.0 / 16384.0, "sample mismatch: {a} vs {b}");
    }
}

#[test]
fn raw_scale_keeps_integer_values() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
    };
    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &[0.5, -0.5, 0.0], spec).unwrap();

    let (raw, _) = read_wav(file.path(), SampleScale::Raw).unwrap();
    assert_eq!(raw, vec![16384.0, -16384.0, 0.0]);
}

// ---------------------------------------------------------------------------
// Multi-channel
// ---------------------------------------------------------------------------

#[test]
fn stereo_mixdown_averages_channels() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 32,
    };
    let file = NamedTempFile::new().unwrap();
    write_wav_channels(file.path(), &[vec![1.0, 0.5], vec![0.0, -0.5]], spec).unwrap();

    let (mono, loaded_spec) = read_wav(file.path(), SampleScale::Normalized).unwrap();
    assert_eq!(loaded_spec.channels, 2);
    assert_eq!(mono, vec![0.5, 0.0]);
}

#[test]
fn channels_are_split_in_file_order() {
    let sr = 44100;
    let left = sine_wave(sr, 1000.0, 1000, 0.5);
    let right = sine_wave(sr, 3400.0, 1000, 0.25);
    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_channels(file.path(), &[left.clone(), right.clone()], spec).unwrap();

    let (channels, loaded_spec) = read_wav_channels(file.path(), SampleScale::Normalized).unwrap();
    assert_eq!(loaded_spec.channels, 2);
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0], left);
    assert_eq!(channels[1], right);
}

// ---------------------------------------------------------------------------
// Trimming and errors
// ---------------------------------------------------------------------------

#[test]
fn trim_after_load() {
    let sr = 1000;
    let samples: Vec<f32> = (0..5000).map(|i| i as f32 / 5000.0).collect();
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };
    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path(), SampleScale::Normalized).unwrap();
    let trimmed = trim_edges(&loaded, loaded_spec.sample_rate, 1.0);
    assert_eq!(trimmed.len(), 3000);
    assert_eq!(trimmed[0], samples[1000]);
}

#[test]
fn missing_file_is_an_error() {
    let result = read_wav("/nonexistent/path/to/file.wav", SampleScale::Normalized);
    // hound reports open failures itself, so they surface as WAV errors
    assert!(matches!(result, Err(tonescope_io::Error::Wav(_))));
}
