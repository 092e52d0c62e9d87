//! Configuration for the tonescope analysis tools.
//!
//! This crate loads analysis settings from TOML, checks them, converts them
//! into [`tonescope_analysis::AnalysisParams`], and writes parameter records
//! next to analysis outputs.
//!
//! # Features
//!
//! - **Config files**: [`AnalysisConfig`] with `[spectrum]`, `[search]`,
//!   `[noise_floor]` and `[snr]` sections, all optional
//! - **Validation**: every problem in a config is reported at once
//! - **Parameter records**: [`ParameterRecord`] captures the settings and
//!   inputs of a run
//!
//! # Example
//!
//! ```rust,no_run
//! use tonescope_analysis::ToneSet;
//! use tonescope_config::{AnalysisConfig, ParameterRecord};
//!
//! let config = AnalysisConfig::load("tonescope.toml").unwrap();
//! let params = config.to_params(ToneSet::default()).unwrap();
//!
//! ParameterRecord::new("peaks", config)
//!     .with_file("input", "recording.wav")
//!     .save(ParameterRecord::path_for("recording"))
//!     .unwrap();
//! ```

mod config;
mod error;
mod record;

/// Config validation.
pub mod validation;

pub use config::{AnalysisConfig, NoiseFloorSection, SearchSection, SnrSection, SpectrumSection};
pub use error::ConfigError;
pub use record::{ParameterRecord, RECORD_SUFFIX};
pub use validation::{ValidationError, ValidationResult};
