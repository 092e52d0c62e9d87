//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::io::Read;
use std::path::Path;

/// How integer PCM samples are mapped to `f32`.
///
/// Float files are passed through unchanged under either scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleScale {
    /// Divide by `2^(bits - 1)` so full scale is `[-1, 1)`.
    #[default]
    Normalized,
    /// Keep the integer sample values.
    Raw,
}

/// WAV file specification.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (e.g., 16, 24, 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Decode every interleaved sample of `reader`.
fn read_interleaved<R: Read>(reader: WavReader<R>, scale: SampleScale) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let divisor = match scale {
                SampleScale::Normalized => (1i64 << (spec.bits_per_sample - 1)) as f32,
                SampleScale::Raw => 1.0,
            };
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / divisor))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(samples)
}

/// Read a WAV file and return samples as f32 along with the spec.
///
/// Multi-channel files are mixed down to mono by averaging channels.
///
/// # Example
/// ```ignore
/// let (samples, spec) = read_wav("input.wav", SampleScale::Normalized)?;
/// println!("Loaded {} samples at {} Hz", samples.len(), spec.sample_rate);
/// ```
pub fn read_wav<P: AsRef<Path>>(path: P, scale: SampleScale) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(Error::NoChannels);
    }

    let samples = read_interleaved(reader, scale)?;

    // Mix down to mono if multi-channel
    let mono_samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    tracing::debug!(
        frames = mono_samples.len(),
        channels,
        sample_rate = spec.sample_rate,
        "loaded wav"
    );
    Ok((mono_samples, spec))
}

/// Read a WAV file keeping every channel separate.
///
/// The result holds one buffer per channel in file order; a trailing
/// partial frame is dropped.
pub fn read_wav_channels<P: AsRef<Path>>(
    path: P,
    scale: SampleScale,
) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(Error::NoChannels);
    }

    let interleaved = read_interleaved(reader, scale)?;
    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (buf, &sample) in out.iter_mut().zip(frame) {
            buf.push(sample);
        }
    }

    tracing::debug!(frames, channels, sample_rate = spec.sample_rate, "loaded wav channels");
    Ok((out, spec))
}

/// Drop `seconds` of audio from both the start and the end.
///
/// Returns an empty slice when the cut covers the whole signal.
pub fn trim_edges(samples: &[f32], sample_rate: u32, seconds: f64) -> &[f32] {
    if seconds <= 0.0 {
        return samples;
    }
    let cut = (seconds * f64::from(sample_rate)).round() as usize;
    if cut.saturating_mul(2) >= samples.len() {
        tracing::warn!(
            seconds,
            available = samples.len(),
            "trim removes the whole signal"
        );
        return &[];
    }
    &samples[cut..samples.len() - cut]
}

/// Write mono samples to a WAV file.
///
/// Samples are expected in `[-1, 1]` for integer bit depths; 32-bit specs
/// are written as float.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let mut mono_spec = spec;
    mono_spec.channels = 1;
    write_wav_channels(path, &[samples.to_vec()], mono_spec)
}

/// Write one buffer per channel to an interleaved WAV file.
pub fn write_wav_channels<P: AsRef<Path>>(
    path: P,
    channels: &[Vec<f32>],
    spec: WavSpec,
) -> Result<()> {
    let lengths: Vec<usize> = channels.iter().map(Vec::len).collect();
    if lengths.is_empty() {
        return Err(Error::NoChannels);
    }
    if lengths.iter().any(|&len| len != lengths[0]) {
        return Err(Error::ChannelLengthMismatch(lengths));
    }

    let mut file_spec = spec;
    file_spec.channels = channels.len() as u16;
    let mut writer = WavWriter::create(path, hound::WavSpec::from(file_spec))?;

    let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
    for i in 0..lengths[0] {
        for channel in channels {
            let sample = channel[i];
            if spec.bits_per_sample == 32 {
                writer.write_sample(sample)?;
            } else {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_cuts_both_ends() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(trim_edges(&samples, 2, 1.0), &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn trim_zero_is_identity() {
        let samples = [1.0, 2.0, 3.0];
        assert_eq!(trim_edges(&samples, 48000, 0.0), &samples);
    }

    #[test]
    fn trim_longer_than_signal_is_empty() {
        let samples = [0.0f32; 100];
        assert!(trim_edges(&samples, 100, 0.5).is_empty());
    }

    #[test]
    fn default_spec_is_cd_mono() {
        let spec = WavSpec::default();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn mismatched_channel_lengths_are_rejected() {
        let dir = std::env::temp_dir().join("tonescope-io-mismatch.wav");
        let err = write_wav_channels(&dir, &[vec![0.0; 4], vec![0.0; 3]], WavSpec::default())
            .unwrap_err();
        assert!(matches!(err, Error::ChannelLengthMismatch(ref l) if l == &[4, 3]));
    }
}
