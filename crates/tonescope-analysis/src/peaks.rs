//! Toneset handling and per-tone peak search.

use crate::error::{AnalysisWarning, Result, SkippedLine, TableParse};
use crate::spectrum::{LevelScale, Spectrum};
use std::path::Path;

/// Built-in reference set of calibration tones in Hz.
pub const DEFAULT_TONESET: [u32; 11] = [
    100, 800, 1000, 3400, 4800, 5800, 6400, 7800, 9000, 9400, 9500,
];

/// Ordered list of expected tone frequencies in Hz. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneSet {
    tones: Vec<u32>,
}

impl Default for ToneSet {
    fn default() -> Self {
        Self {
            tones: DEFAULT_TONESET.to_vec(),
        }
    }
}

impl From<Vec<u32>> for ToneSet {
    fn from(tones: Vec<u32>) -> Self {
        Self { tones }
    }
}

impl ToneSet {
    /// Tones in file order.
    pub fn tones(&self) -> &[u32] {
        &self.tones
    }

    /// Number of tones.
    pub fn len(&self) -> usize {
        self.tones.len()
    }

    /// True if no tones are present.
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    /// Parse a toneset text: one positive integer per line.
    ///
    /// Blank lines and `#` comments are ignored; anything else that does not
    /// parse is skipped and reported.
    pub fn parse(text: &str) -> TableParse<ToneSet> {
        let mut tones = Vec::new();
        let mut skipped = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<u32>() {
                Ok(0) => skipped.push(SkippedLine {
                    line: idx + 1,
                    content: line.to_string(),
                    reason: "tone frequency must be positive".to_string(),
                }),
                Ok(tone) => tones.push(tone),
                Err(e) => skipped.push(SkippedLine {
                    line: idx + 1,
                    content: line.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        for s in &skipped {
            tracing::warn!(line = s.line, content = %s.content, reason = %s.reason, "skipping toneset line");
        }

        TableParse {
            value: ToneSet { tones },
            skipped,
        }
    }

    /// Read and parse a toneset file.
    pub fn load(path: impl AsRef<Path>) -> Result<TableParse<ToneSet>> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }
}

/// Strongest bin found near a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Bin frequency in Hz.
    pub frequency: f64,
    /// Bin level, on the scale of the searched spectrum.
    pub intensity: f64,
}

/// Result of a toneset search.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSearch {
    /// One peak per tone that had in-window bins, in toneset order.
    pub peaks: Vec<Peak>,
    /// Scale of every peak intensity.
    pub scale: LevelScale,
    /// Tones that were skipped.
    pub warnings: Vec<AnalysisWarning>,
}

/// Find the strongest bin within `±search_range_hz` of every tone.
///
/// Ties go to the lowest frequency. Tones whose window holds no bins (for
/// example above Nyquist) produce a warning instead of a peak.
pub fn find_peaks(spectrum: &Spectrum, toneset: &ToneSet, search_range_hz: f64) -> PeakSearch {
    let mut peaks = Vec::with_capacity(toneset.len());
    let mut warnings = Vec::new();

    for &tone in toneset.tones() {
        let low = f64::from(tone) - search_range_hz;
        let high = f64::from(tone) + search_range_hz;

        let mut best: Option<Peak> = None;
        for (&frequency, &intensity) in spectrum.frequencies.iter().zip(&spectrum.magnitudes) {
            if frequency < low || frequency > high {
                continue;
            }
            match best {
                Some(b) if intensity <= b.intensity => {}
                // NaN never displaces an existing candidate
                Some(_) if intensity.is_nan() => {}
                _ => best = Some(Peak { frequency, intensity }),
            }
        }

        match best {
            Some(peak) => peaks.push(peak),
            None => {
                tracing::warn!(tone, search_range_hz, "no peaks found within search range");
                warnings.push(AnalysisWarning::ToneNotFound { tone });
            }
        }
    }

    PeakSearch {
        peaks,
        scale: spectrum.scale,
        warnings,
    }
}
