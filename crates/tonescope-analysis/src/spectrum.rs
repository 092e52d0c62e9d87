//! Averaged spectrum estimation.
//!
//! A waveform is cut into fixed-size, optionally overlapping segments. Each
//! segment is transformed, reduced to amplitude or power per bin, and the
//! per-segment results are averaged arithmetically into one spectrum.
//!
//! ```rust,ignore
//! use tonescope_analysis::spectrum::{SpectrumEstimator, SpectrumKind};
//!
//! let spectrum = SpectrumEstimator::new(2048)
//!     .with_overlap(50.0)
//!     .with_kind(SpectrumKind::PowerDensity)
//!     .with_decibels(true)
//!     .estimate(&samples, 44100)?;
//! ```

use crate::error::{AnalysisError, Result};
use crate::fft::{Fft, Window};
use std::fmt;

/// Guard added before taking a logarithm so silent bins stay finite.
pub const DB_EPSILON: f64 = f64::EPSILON;

/// Whether levels are linear quantities or decibels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelScale {
    /// Linear amplitude or power.
    Linear,
    /// Logarithmic decibel scale.
    Decibel,
}

impl fmt::Display for LevelScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelScale::Linear => f.write_str("linear"),
            LevelScale::Decibel => f.write_str("decibel"),
        }
    }
}

/// Per-bin quantity computed from each transformed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumKind {
    /// `|X|`
    Amplitude,
    /// `|X|^2`
    #[default]
    Power,
    /// `|X|^2 / (sample_rate * fft_size)`
    PowerDensity,
}

impl SpectrumKind {
    /// Parse a kind name as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "amplitude" | "magnitude" => Some(SpectrumKind::Amplitude),
            "power" => Some(SpectrumKind::Power),
            "power-density" | "psd" => Some(SpectrumKind::PowerDensity),
            _ => None,
        }
    }

    /// Canonical name, the inverse of [`SpectrumKind::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            SpectrumKind::Amplitude => "amplitude",
            SpectrumKind::Power => "power",
            SpectrumKind::PowerDensity => "power-density",
        }
    }

    /// Decibel multiplier: 20 for amplitudes, 10 for powers.
    pub fn db_factor(&self) -> f64 {
        match self {
            SpectrumKind::Amplitude => 20.0,
            SpectrumKind::Power | SpectrumKind::PowerDensity => 10.0,
        }
    }

    /// Convert a linear value of this kind to decibels.
    pub fn to_db(&self, value: f64) -> f64 {
        self.db_factor() * (value + DB_EPSILON).log10()
    }
}

/// An averaged spectrum over the lower half of the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin frequencies in Hz, strictly ascending.
    pub frequencies: Vec<f64>,
    /// Level per bin, same length as `frequencies`.
    pub magnitudes: Vec<f64>,
    /// Quantity each bin holds.
    pub kind: SpectrumKind,
    /// Scale of `magnitudes`.
    pub scale: LevelScale,
}

impl Spectrum {
    /// Number of bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True if the spectrum holds no bins.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Keep only bins with `low_hz <= f <= high_hz`.
    pub fn band(&self, low_hz: f64, high_hz: f64) -> Spectrum {
        let (frequencies, magnitudes) = self
            .frequencies
            .iter()
            .zip(&self.magnitudes)
            .filter(|&(&f, _)| f >= low_hz && f <= high_hz)
            .map(|(&f, &m)| (f, m))
            .unzip();
        Spectrum {
            frequencies,
            magnitudes,
            kind: self.kind,
            scale: self.scale,
        }
    }

    /// Return the spectrum in decibels, converting if it is linear.
    pub fn to_decibels(&self) -> Spectrum {
        match self.scale {
            LevelScale::Decibel => self.clone(),
            LevelScale::Linear => Spectrum {
                frequencies: self.frequencies.clone(),
                magnitudes: self.magnitudes.iter().map(|&m| self.kind.to_db(m)).collect(),
                kind: self.kind,
                scale: LevelScale::Decibel,
            },
        }
    }
}

/// Segment-averaging spectrum estimator.
#[derive(Debug, Clone)]
pub struct SpectrumEstimator {
    fft_size: usize,
    overlap_percent: f64,
    kind: SpectrumKind,
    decibels: bool,
    window: Window,
}

impl SpectrumEstimator {
    /// Create an estimator with no overlap, power bins, linear output and no taper.
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            overlap_percent: 0.0,
            kind: SpectrumKind::Power,
            decibels: false,
            window: Window::Rectangular,
        }
    }

    /// Set segment overlap in percent, `0 <= overlap < 100`.
    pub fn with_overlap(mut self, overlap_percent: f64) -> Self {
        self.overlap_percent = overlap_percent;
        self
    }

    /// Set the per-bin quantity.
    pub fn with_kind(mut self, kind: SpectrumKind) -> Self {
        self.kind = kind;
        self
    }

    /// Convert the averaged spectrum to decibels.
    pub fn with_decibels(mut self, decibels: bool) -> Self {
        self.decibels = decibels;
        self
    }

    /// Apply a taper to every segment before transforming it.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// FFT size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Hop between segment starts, never less than one sample.
    pub fn step_size(&self) -> usize {
        let step = (self.fft_size as f64 * (1.0 - self.overlap_percent / 100.0)).floor();
        (step as usize).max(1)
    }

    /// Number of whole segments that fit in `len` samples.
    pub fn segment_count(&self, len: usize) -> usize {
        if len < self.fft_size {
            return 0;
        }
        (len - self.fft_size) / self.step_size() + 1
    }

    fn validate(&self, sample_rate: u32) -> Result<()> {
        if self.fft_size < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "fft size must be at least 2, got {}",
                self.fft_size
            )));
        }
        if !(0.0..100.0).contains(&self.overlap_percent) {
            return Err(AnalysisError::InvalidParameter(format!(
                "overlap must be in [0, 100), got {}",
                self.overlap_percent
            )));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Estimate the averaged spectrum of `samples`.
    pub fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrum> {
        self.validate(sample_rate)?;
        if samples.len() < self.fft_size {
            return Err(AnalysisError::InsufficientData {
                needed: self.fft_size,
                available: samples.len(),
            });
        }

        let step = self.step_size();
        let num_segments = self.segment_count(samples.len());
        let bins = self.fft_size / 2;
        tracing::debug!(
            fft_size = self.fft_size,
            step,
            num_segments,
            "estimating spectrum"
        );

        let fft = Fft::new(self.fft_size);
        let mut sum = vec![0.0f64; bins];
        let mut segment = vec![0.0f64; self.fft_size];

        for i in 0..num_segments {
            let start = i * step;
            for (dst, &src) in segment
                .iter_mut()
                .zip(&samples[start..start + self.fft_size])
            {
                *dst = f64::from(src);
            }
            self.window.apply(&mut segment);

            let spectrum = fft.forward(&segment);
            for (acc, c) in sum.iter_mut().zip(&spectrum) {
                *acc += match self.kind {
                    SpectrumKind::Amplitude => c.norm(),
                    SpectrumKind::Power | SpectrumKind::PowerDensity => c.norm_sqr(),
                };
            }
        }

        let mut norm = num_segments as f64;
        if self.kind == SpectrumKind::PowerDensity {
            norm *= f64::from(sample_rate) * self.fft_size as f64;
        }
        let mut magnitudes: Vec<f64> = sum.into_iter().map(|s| s / norm).collect();

        let scale = if self.decibels {
            for m in &mut magnitudes {
                *m = self.kind.to_db(*m);
            }
            LevelScale::Decibel
        } else {
            LevelScale::Linear
        };

        let bin_width = f64::from(sample_rate) / self.fft_size as f64;
        let frequencies = (0..bins).map(|k| k as f64 * bin_width).collect();

        Ok(Spectrum {
            frequencies,
            magnitudes,
            kind: self.kind,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, len: usize, amplitude: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_step_and_segment_count() {
        let est = SpectrumEstimator::new(1024).with_overlap(50.0);
        assert_eq!(est.step_size(), 512);
        assert_eq!(est.segment_count(1024), 1);
        assert_eq!(est.segment_count(2047), 2);
        assert_eq!(est.segment_count(2048), 3);
        assert_eq!(est.segment_count(1000), 0);
    }

    #[test]
    fn test_step_never_zero() {
        let est = SpectrumEstimator::new(4).with_overlap(99.9);
        assert_eq!(est.step_size(), 1);
    }

    #[test]
    fn test_lengths_and_axis() {
        let samples = sine(1000.0, 8000.0, 4096, 1.0);
        let spectrum = SpectrumEstimator::new(256).estimate(&samples, 8000).unwrap();
        assert_eq!(spectrum.len(), 128);
        assert_eq!(spectrum.magnitudes.len(), 128);
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert!((spectrum.frequencies[1] - 31.25).abs() < 1e-12);
        assert!(spectrum.frequencies.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bin_centered_tone_power() {
        // 1000 Hz at 8000 Hz / 256 lands exactly on bin 32
        let samples = sine(1000.0, 8000.0, 256, 1.0);
        let spectrum = SpectrumEstimator::new(256).estimate(&samples, 8000).unwrap();
        let expected = (256.0f64 / 2.0).powi(2);
        assert!((spectrum.magnitudes[32] - expected).abs() / expected < 1e-5);
    }

    #[test]
    fn test_amplitude_db_matches_power_db() {
        let samples = sine(1000.0, 8000.0, 2048, 0.5);
        let amp = SpectrumEstimator::new(256)
            .with_kind(SpectrumKind::Amplitude)
            .with_decibels(true)
            .estimate(&samples, 8000)
            .unwrap();
        let pow = SpectrumEstimator::new(256)
            .with_decibels(true)
            .estimate(&samples, 8000)
            .unwrap();
        assert!((amp.magnitudes[32] - pow.magnitudes[32]).abs() < 1e-6);
        assert_eq!(amp.scale, LevelScale::Decibel);
    }

    #[test]
    fn test_power_density_scaling() {
        let samples = sine(1000.0, 8000.0, 256, 1.0);
        let power = SpectrumEstimator::new(256).estimate(&samples, 8000).unwrap();
        let psd = SpectrumEstimator::new(256)
            .with_kind(SpectrumKind::PowerDensity)
            .estimate(&samples, 8000)
            .unwrap();
        let ratio = power.magnitudes[32] / psd.magnitudes[32];
        assert!((ratio - 8000.0 * 256.0).abs() / ratio < 1e-9);
    }

    #[test]
    fn test_silence_db_is_finite() {
        let spectrum = SpectrumEstimator::new(64)
            .with_decibels(true)
            .estimate(&[0.0; 64], 1000)
            .unwrap();
        assert!(spectrum.magnitudes.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn test_insufficient_data() {
        let err = SpectrumEstimator::new(2048)
            .estimate(&[0.0; 100], 44100)
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData {
                needed: 2048,
                available: 100
            }
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let samples = vec![0.0; 4096];
        assert!(matches!(
            SpectrumEstimator::new(0).estimate(&samples, 1000),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            SpectrumEstimator::new(256).with_overlap(100.0).estimate(&samples, 1000),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            SpectrumEstimator::new(256).with_overlap(-1.0).estimate(&samples, 1000),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            SpectrumEstimator::new(256).estimate(&samples, 0),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_band_restriction() {
        let samples = sine(1000.0, 8000.0, 1024, 1.0);
        let spectrum = SpectrumEstimator::new(256).estimate(&samples, 8000).unwrap();
        let band = spectrum.band(500.0, 1500.0);
        assert!(band.frequencies.iter().all(|&f| (500.0..=1500.0).contains(&f)));
        assert_eq!(band.frequencies.len(), band.magnitudes.len());
        assert_eq!(band.frequencies.first().copied(), Some(500.0));
        assert_eq!(band.frequencies.last().copied(), Some(1500.0));
    }

    #[test]
    fn test_to_decibels_converts_once() {
        let samples = sine(1000.0, 8000.0, 1024, 1.0);
        let linear = SpectrumEstimator::new(256).estimate(&samples, 8000).unwrap();
        let db = linear.to_decibels();
        assert_eq!(db.scale, LevelScale::Decibel);
        assert_eq!(db.to_decibels(), db);
        assert!((db.magnitudes[32] - 10.0 * linear.magnitudes[32].log10()).abs() < 1e-9);
    }
}
