//! Signal-to-noise ratio of detected peaks against a noise floor.

use crate::error::{AnalysisError, AnalysisWarning, Result};
use crate::fit::FitCurve;
use crate::noise_floor::NoiseFloor;
use crate::peaks::PeakSearch;
use crate::spectrum::LevelScale;
use std::fmt;

/// How a peak intensity and a floor level combine into an SNR.
///
/// The two modes are mutually exclusive configurations; one pipeline uses
/// one of them throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitMode {
    /// Both levels in dB: `snr = intensity - floor`.
    #[default]
    DbSubtract,
    /// Both levels linear: `snr = 10 * log10(intensity / floor)`.
    RatioDb,
}

impl UnitMode {
    /// Parse a mode name as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "db-subtract" => Some(UnitMode::DbSubtract),
            "ratio-db" => Some(UnitMode::RatioDb),
            _ => None,
        }
    }

    /// Canonical name, the inverse of [`UnitMode::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            UnitMode::DbSubtract => "db-subtract",
            UnitMode::RatioDb => "ratio-db",
        }
    }

    /// Scale both inputs must be on.
    pub fn expected_scale(&self) -> LevelScale {
        match self {
            UnitMode::DbSubtract => LevelScale::Decibel,
            UnitMode::RatioDb => LevelScale::Linear,
        }
    }

    /// Combine an intensity with a floor level.
    pub fn combine(&self, intensity: f64, floor: f64) -> f64 {
        match self {
            UnitMode::DbSubtract => intensity - floor,
            UnitMode::RatioDb => 10.0 * (intensity / floor).log10(),
        }
    }

    fn check(&self, found: LevelScale) -> Result<()> {
        let expected = self.expected_scale();
        if found == expected {
            Ok(())
        } else {
            Err(AnalysisError::ScaleMismatch {
                mode: *self,
                expected,
                found,
            })
        }
    }
}

impl fmt::Display for UnitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SNR of one peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnrResult {
    /// Noise-floor frequency the peak was matched to, in Hz.
    pub matched_frequency: i64,
    /// Peak intensity.
    pub intensity: f64,
    /// Floor level used, NaN when no entry was within tolerance.
    pub noise_floor_value: f64,
    /// Signal-to-noise ratio in dB, NaN when unmatched.
    pub snr: f64,
}

/// SNR rows plus the metadata needed to report them.
#[derive(Debug, Clone, PartialEq)]
pub struct SnrReport {
    /// One row per peak, in peak order.
    pub results: Vec<SnrResult>,
    /// Combination rule used.
    pub mode: UnitMode,
    /// Peaks that found no floor entry.
    pub warnings: Vec<AnalysisWarning>,
}

/// Compute the SNR of every peak.
///
/// Each peak is matched to the floor entry at its exact frequency, or else to
/// the nearest entry within `search_range_hz`. An unmatched peak keeps its
/// row with NaN values. When `fit` is given, the curve evaluated at the peak
/// frequency replaces the table lookup.
///
/// Matching scans every floor entry per peak, which is fine for tonesets of a
/// few dozen tones but not for dense per-bin matching.
pub fn compute_snr(
    peaks: &PeakSearch,
    noise_floor: &NoiseFloor,
    search_range_hz: f64,
    mode: UnitMode,
    fit: Option<&FitCurve>,
) -> Result<SnrReport> {
    if noise_floor.is_empty() {
        tracing::warn!("noise floor data is empty");
        return Err(AnalysisError::EmptyNoiseFloor);
    }
    mode.check(peaks.scale)?;
    mode.check(noise_floor.scale())?;

    let mut results = Vec::with_capacity(peaks.peaks.len());
    let mut warnings = Vec::new();

    for peak in &peaks.peaks {
        let freq = peak.frequency;

        if let Some(curve) = fit {
            let fitted = curve.evaluate(freq);
            let snr = mode.combine(peak.intensity, fitted);
            tracing::debug!(freq, fitted, snr, "fitted noise floor");
            results.push(SnrResult {
                matched_frequency: freq.round() as i64,
                intensity: peak.intensity,
                noise_floor_value: fitted,
                snr,
            });
            continue;
        }

        let matched = noise_floor.exact(freq).or_else(|| {
            let nearest = noise_floor.nearest(freq, search_range_hz);
            if let Some((key, _)) = nearest {
                tracing::debug!(closest = key, freq, "using closest noise floor frequency");
            }
            nearest
        });

        match matched {
            Some((key, level)) => results.push(SnrResult {
                matched_frequency: key,
                intensity: peak.intensity,
                noise_floor_value: level,
                snr: mode.combine(peak.intensity, level),
            }),
            None => {
                tracing::warn!(freq, search_range_hz, "no suitable noise floor frequency within search range");
                warnings.push(AnalysisWarning::FrequencyMatch { frequency: freq });
                results.push(SnrResult {
                    matched_frequency: freq.round() as i64,
                    intensity: peak.intensity,
                    noise_floor_value: f64::NAN,
                    snr: f64::NAN,
                });
            }
        }
    }

    Ok(SnrReport {
        results,
        mode,
        warnings,
    })
}
