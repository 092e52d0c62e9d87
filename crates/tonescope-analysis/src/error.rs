//! Error and warning types for the analysis pipeline.

use crate::snr::UnitMode;
use crate::spectrum::LevelScale;
use std::fmt;

/// Errors that abort a single analysis call.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The waveform is shorter than one transform window.
    #[error("insufficient data: need at least {needed} samples, got {available}")]
    InsufficientData {
        /// Samples required for one FFT segment.
        needed: usize,
        /// Samples actually supplied.
        available: usize,
    },

    /// A noise floor was requested from a zero-length spectrum.
    #[error("spectrum is empty")]
    EmptySpectrum,

    /// SNR was requested against an empty noise-floor table.
    #[error("noise floor data is empty")]
    EmptyNoiseFloor,

    /// A parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Peaks or noise floor are not on the scale the unit mode combines.
    #[error("unit mode {mode} expects {expected} levels, found {found}")]
    ScaleMismatch {
        /// Combination rule requested by the caller.
        mode: UnitMode,
        /// Scale the rule requires.
        expected: LevelScale,
        /// Scale actually supplied.
        found: LevelScale,
    },

    /// A fit-coefficient file does not hold exactly three coefficients.
    #[error("invalid fit coefficient file: {0}")]
    InvalidFitFile(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Non-fatal conditions surfaced alongside results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisWarning {
    /// No spectrum bin lies within the search window of this tone.
    ToneNotFound {
        /// Requested tone frequency in Hz.
        tone: u32,
    },
    /// No noise-floor entry lies within tolerance of this peak frequency.
    FrequencyMatch {
        /// Peak frequency in Hz.
        frequency: f64,
    },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::ToneNotFound { tone } => {
                write!(f, "no spectrum bins within search range of tone {tone} Hz")
            }
            AnalysisWarning::FrequencyMatch { frequency } => {
                write!(f, "no noise floor entry within search range of {frequency} Hz")
            }
        }
    }
}

/// A line of a text table that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    /// The offending line, trimmed.
    pub content: String,
    /// Why it was rejected.
    pub reason: String,
}

/// A parsed table plus the lines that were skipped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct TableParse<T> {
    /// The successfully parsed value.
    pub value: T,
    /// Lines rejected during parsing.
    pub skipped: Vec<SkippedLine>,
}
