//! Noise-floor estimation.
//!
//! A floor is derived from a spectrum by, in this order:
//!
//! 1. replacing the bins around every detected peak with a straight line
//!    between the region's edge bins ([`remove_signal_peaks`]),
//! 2. smoothing with a centered box filter ([`moving_average`]),
//! 3. optionally restricting to a frequency band,
//! 4. optionally fitting (or applying a saved) quadratic curve.
//!
//! Removal runs before smoothing so the kernel cannot spread peak energy back
//! into the floor. A floor can also be loaded from a text table instead
//! ([`NoiseFloor::load`]).

use crate::error::{AnalysisError, AnalysisWarning, Result, SkippedLine, TableParse};
use crate::fit::FitCurve;
use crate::peaks::{Peak, ToneSet};
use crate::spectrum::{LevelScale, Spectrum, SpectrumKind};
use std::collections::BTreeMap;
use std::path::Path;

/// Centered moving average with "same"-length output.
///
/// Output `i` is the mean over a `window_size` box aligned like numpy's
/// `convolve(x, ones(w) / w, "same")`: it covers inputs
/// `i + (w - 1) / 2 - (w - 1) ..= i + (w - 1) / 2`, with zeros beyond the
/// edges. A window of zero or less returns the input unchanged.
pub fn moving_average(values: &[f64], window_size: isize) -> Vec<f64> {
    if window_size <= 0 || values.is_empty() {
        return values.to_vec();
    }
    let w = window_size as usize;
    let n = values.len();
    let offset = (w - 1) / 2;
    let scale = 1.0 / w as f64;

    (0..n)
        .map(|i| {
            let hi = i + offset;
            let lo = (hi + 1).saturating_sub(w);
            let hi = hi.min(n - 1);
            if lo > hi {
                0.0
            } else {
                values[lo..=hi].iter().sum::<f64>() * scale
            }
        })
        .collect()
}

/// Flatten the region within `±half_width_hz` of every peak.
///
/// Regions that overlap or touch are merged first. Each merged run of bins is
/// replaced by linear interpolation between its first and last bin, and those
/// edge bins keep their values, so a second pass with the same peaks changes
/// nothing. `frequencies` must be ascending and as long as `levels`.
pub fn remove_signal_peaks(
    frequencies: &[f64],
    levels: &[f64],
    peaks: &[Peak],
    half_width_hz: f64,
) -> Vec<f64> {
    debug_assert_eq!(frequencies.len(), levels.len());

    let mut runs: Vec<(usize, usize)> = peaks
        .iter()
        .filter_map(|peak| {
            let low = peak.frequency - half_width_hz;
            let high = peak.frequency + half_width_hz;
            let in_region = |f: &f64| *f >= low && *f <= high;
            let first = frequencies.iter().position(in_region)?;
            let last = frequencies.iter().rposition(in_region).unwrap_or(first);
            Some((first, last))
        })
        .collect();
    runs.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(runs.len());
    for (first, last) in runs {
        match merged.last_mut() {
            Some(prev) if first <= prev.1 + 1 => prev.1 = prev.1.max(last),
            _ => merged.push((first, last)),
        }
    }

    let mut out = levels.to_vec();
    for (first, last) in merged {
        if last <= first + 1 {
            continue;
        }
        let (f0, f1) = (frequencies[first], frequencies[last]);
        let (v0, v1) = (levels[first], levels[last]);
        for i in first + 1..last {
            let t = (frequencies[i] - f0) / (f1 - f0);
            out[i] = v0 + (v1 - v0) * t;
        }
    }
    out
}

/// Whether and how a quadratic curve is attached to the floor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FitMode {
    /// No curve.
    #[default]
    None,
    /// Least-squares fit to the estimated floor.
    Compute,
    /// Evaluate a previously fitted curve without refitting.
    Apply(FitCurve),
}

/// Options for [`estimate_noise_floor`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoiseFloorOptions {
    /// Moving-average window in bins; `<= 0` disables smoothing.
    pub moving_average: isize,
    /// Half width in Hz of the region flattened around each peak.
    pub remove_signals: Option<f64>,
    /// Inclusive `(low, high)` band kept after smoothing.
    pub band: Option<(f64, f64)>,
    /// Curve fitting.
    pub fit: FitMode,
}

/// Per-bin noise-floor estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFloorSpectrum {
    /// Bin frequencies in Hz.
    pub frequencies: Vec<f64>,
    /// Floor level per bin.
    pub levels: Vec<f64>,
    /// Scale of `levels`.
    pub scale: LevelScale,
    /// Curve attached by [`FitMode::Compute`] or [`FitMode::Apply`].
    pub fit: Option<FitCurve>,
    /// `fit` evaluated on `frequencies`.
    pub fitted: Option<Vec<f64>>,
}

impl NoiseFloorSpectrum {
    /// Table keyed by integer frequency; later bins win on collisions.
    pub fn to_table(&self) -> NoiseFloor {
        NoiseFloor::from_entries(
            self.scale,
            self.frequencies
                .iter()
                .zip(&self.levels)
                .map(|(&f, &level)| (f.trunc() as i64, level)),
        )
    }
}

/// Estimate the noise floor of `spectrum` underneath `peaks`.
pub fn estimate_noise_floor(
    spectrum: &Spectrum,
    peaks: &[Peak],
    options: &NoiseFloorOptions,
) -> Result<NoiseFloorSpectrum> {
    if spectrum.is_empty() {
        return Err(AnalysisError::EmptySpectrum);
    }

    let mut levels = spectrum.magnitudes.clone();
    if let Some(half_width) = options.remove_signals {
        levels = remove_signal_peaks(&spectrum.frequencies, &levels, peaks, half_width);
    }
    levels = moving_average(&levels, options.moving_average);

    let mut frequencies = spectrum.frequencies.clone();
    if let Some((low, high)) = options.band {
        (frequencies, levels) = frequencies
            .into_iter()
            .zip(levels)
            .filter(|&(f, _)| f >= low && f <= high)
            .unzip();
        if frequencies.is_empty() {
            return Err(AnalysisError::EmptySpectrum);
        }
    }

    let fit = match options.fit {
        FitMode::None => None,
        FitMode::Compute => Some(FitCurve::fit(&frequencies, &levels)?),
        FitMode::Apply(curve) => Some(curve),
    };
    let fitted = fit.map(|curve| curve.evaluate_all(&frequencies));

    Ok(NoiseFloorSpectrum {
        frequencies,
        levels,
        scale: spectrum.scale,
        fit,
        fitted,
    })
}

/// Which level column of a noise-floor file to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloorColumn {
    /// Second column, linear level.
    Linear,
    /// Third column, dB level.
    #[default]
    Decibel,
}

impl FloorColumn {
    /// Parse a column name as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" => Some(FloorColumn::Linear),
            "decibel" | "db" => Some(FloorColumn::Decibel),
            _ => None,
        }
    }

    /// Canonical name, the inverse of [`FloorColumn::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            FloorColumn::Linear => "linear",
            FloorColumn::Decibel => "decibel",
        }
    }

    /// Scale of the values in this column.
    pub fn scale(&self) -> LevelScale {
        match self {
            FloorColumn::Linear => LevelScale::Linear,
            FloorColumn::Decibel => LevelScale::Decibel,
        }
    }
}

/// Noise-floor levels keyed by integer frequency in Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFloor {
    levels: BTreeMap<i64, f64>,
    scale: LevelScale,
}

impl NoiseFloor {
    /// Empty table on the given scale.
    pub fn new(scale: LevelScale) -> Self {
        Self {
            levels: BTreeMap::new(),
            scale,
        }
    }

    /// Build a table from `(frequency, level)` pairs.
    pub fn from_entries(scale: LevelScale, entries: impl IntoIterator<Item = (i64, f64)>) -> Self {
        Self {
            levels: entries.into_iter().collect(),
            scale,
        }
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, frequency: i64, level: f64) {
        self.levels.insert(frequency, level);
    }

    /// Level at exactly `frequency`.
    pub fn get(&self, frequency: i64) -> Option<f64> {
        self.levels.get(&frequency).copied()
    }

    /// Scale of the stored levels.
    pub fn scale(&self) -> LevelScale {
        self.scale
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Entries in ascending frequency order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.levels.iter().map(|(&f, &l)| (f, l))
    }

    /// Entry whose key equals `frequency` exactly.
    pub fn exact(&self, frequency: f64) -> Option<(i64, f64)> {
        if frequency.fract() != 0.0 {
            return None;
        }
        let key = frequency as i64;
        self.get(key).map(|level| (key, level))
    }

    /// Entry nearest to `frequency` within `tolerance_hz`; the lower key wins ties.
    pub fn nearest(&self, frequency: f64, tolerance_hz: f64) -> Option<(i64, f64)> {
        let mut best: Option<(f64, i64, f64)> = None;
        for (key, level) in self.iter() {
            let distance = (key as f64 - frequency).abs();
            if distance > tolerance_hz {
                continue;
            }
            if best.is_none_or(|(d, _, _)| distance < d) {
                best = Some((distance, key, level));
            }
        }
        best.map(|(_, key, level)| (key, level))
    }

    /// Parse a noise-floor table: `frequency,linear_level[,db_level]` per line.
    ///
    /// `#` lines are comments. Lines that fail to parse are skipped and
    /// reported; the rest of the table is kept.
    pub fn parse(text: &str, column: FloorColumn) -> TableParse<NoiseFloor> {
        let mut floor = NoiseFloor::new(column.scale());
        let mut skipped = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_floor_line(line, column) {
                Ok((freq, level)) => {
                    tracing::debug!(freq, level, "loaded noise floor entry");
                    floor.insert(freq, level);
                }
                Err(reason) => {
                    tracing::warn!(line = idx + 1, content = line, %reason, "skipping noise floor line");
                    skipped.push(SkippedLine {
                        line: idx + 1,
                        content: line.to_string(),
                        reason,
                    });
                }
            }
        }

        TableParse {
            value: floor,
            skipped,
        }
    }

    /// Read and parse a noise-floor file.
    pub fn load(path: impl AsRef<Path>, column: FloorColumn) -> Result<TableParse<NoiseFloor>> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text, column))
    }
}

fn parse_floor_line(line: &str, column: FloorColumn) -> std::result::Result<(i64, f64), String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(format!("expected 2 or 3 fields, found {}", fields.len()));
    }
    let freq: f64 = fields[0]
        .parse()
        .map_err(|e| format!("bad frequency '{}': {e}", fields[0]))?;
    let index = match column {
        FloorColumn::Linear => 1,
        FloorColumn::Decibel => 2,
    };
    let raw = fields
        .get(index)
        .ok_or_else(|| format!("missing {} level column", column.name()))?;
    let level: f64 = raw
        .parse()
        .map_err(|e| format!("bad {} level '{raw}': {e}", column.name()))?;
    Ok((freq.trunc() as i64, level))
}

/// Mean background level around one tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneFloorLevel {
    /// Tone frequency in Hz.
    pub tone: u32,
    /// Mean linear level within the search window.
    pub linear: f64,
    /// `linear` in dB.
    pub db: f64,
}

/// Per-tone floor levels measured on a background recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneFloorSurvey {
    /// One level per tone with in-window bins, in toneset order.
    pub levels: Vec<ToneFloorLevel>,
    /// Quantity the levels were measured on.
    pub kind: SpectrumKind,
    /// Tones with no bins in their window.
    pub warnings: Vec<AnalysisWarning>,
}

/// Average a linear spectrum over `±search_range_hz` around every tone.
pub fn survey_tone_floor(
    spectrum: &Spectrum,
    toneset: &ToneSet,
    search_range_hz: f64,
) -> Result<ToneFloorSurvey> {
    if spectrum.scale != LevelScale::Linear {
        return Err(AnalysisError::InvalidParameter(
            "tone floor survey needs a linear spectrum".to_string(),
        ));
    }

    let mut levels = Vec::with_capacity(toneset.len());
    let mut warnings = Vec::new();
    for &tone in toneset.tones() {
        let low = f64::from(tone) - search_range_hz;
        let high = f64::from(tone) + search_range_hz;
        let (sum, count) = spectrum
            .frequencies
            .iter()
            .zip(&spectrum.magnitudes)
            .filter(|&(&f, _)| f >= low && f <= high)
            .fold((0.0, 0usize), |(s, n), (_, &m)| (s + m, n + 1));

        if count == 0 {
            tracing::warn!(tone, search_range_hz, "no spectrum bins within search range");
            warnings.push(AnalysisWarning::ToneNotFound { tone });
            continue;
        }
        let linear = sum / count as f64;
        levels.push(ToneFloorLevel {
            tone,
            linear,
            db: spectrum.kind.to_db(linear),
        });
    }

    Ok(ToneFloorSurvey {
        levels,
        kind: spectrum.kind,
        warnings,
    })
}
