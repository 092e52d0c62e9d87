//! Tonescope Analysis - tone peaks, noise floors and SNR
//!
//! This crate measures how far known calibration tones stand above the
//! background of a recording:
//!
//! - [`fft`] - FFT wrapper with optional segment tapers
//! - [`spectrum`] - Segment-averaged amplitude, power and PSD estimation
//! - [`peaks`] - Tonesets and per-tone peak search
//! - [`noise_floor`] - Floor estimation, floor tables and tone-floor surveys
//! - [`fit`] - Quadratic noise-floor curves
//! - [`snr`] - Peak-to-floor signal-to-noise ratio
//! - [`export`] - Result tables and plot data
//! - [`pipeline`] - All of the above for one channel
//!
//! ## Example
//!
//! ```rust,ignore
//! use tonescope_analysis::{AnalysisParams, analyze_channel};
//!
//! let result = analyze_channel(&samples, 44100, &AnalysisParams::default())?;
//! for row in &result.report.results {
//!     println!("{} Hz: {:.1} dB", row.matched_frequency, row.snr);
//! }
//! ```
//!
//! ## Units
//!
//! Every level carries a [`LevelScale`]. The SNR stage refuses to mix
//! scales: [`UnitMode::DbSubtract`] needs decibel inputs and
//! [`UnitMode::RatioDb`] needs linear ones.

pub mod error;
pub mod export;
pub mod fft;
pub mod fit;
pub mod noise_floor;
pub mod peaks;
pub mod pipeline;
pub mod snr;
pub mod spectrum;

// Re-export main types
pub use error::{AnalysisError, AnalysisWarning, Result, SkippedLine, TableParse};
pub use export::{
    CsvPlotWriter, PlotData, SpectrumPlotter, save_snr_table, save_tone_floor_table, write_atomic,
    write_snr_table, write_tone_floor_table,
};
pub use fft::{Fft, Window};
pub use fit::FitCurve;
pub use noise_floor::{
    FitMode, FloorColumn, NoiseFloor, NoiseFloorOptions, NoiseFloorSpectrum, ToneFloorLevel,
    ToneFloorSurvey, estimate_noise_floor, moving_average, remove_signal_peaks, survey_tone_floor,
};
pub use peaks::{DEFAULT_TONESET, Peak, PeakSearch, ToneSet, find_peaks};
pub use pipeline::{
    AnalysisParams, ChannelAnalysis, NoiseFloorParams, SearchParams, SpectrumParams,
    analyze_channel,
};
pub use snr::{SnrReport, SnrResult, UnitMode, compute_snr};
pub use spectrum::{LevelScale, Spectrum, SpectrumEstimator, SpectrumKind};
