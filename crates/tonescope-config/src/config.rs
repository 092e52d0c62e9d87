//! Analysis configuration file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tonescope_analysis::{
    AnalysisParams, FloorColumn, NoiseFloorParams, SearchParams, SpectrumKind, SpectrumParams,
    ToneSet, UnitMode, Window,
};

use crate::error::ConfigError;
use crate::validation::{ValidationError, ValidationResult};

/// Analysis settings shared by the tonescope commands.
///
/// Every field has a default, so a file only needs the values it changes.
///
/// # TOML Format
///
/// ```toml
/// [spectrum]
/// fft_size = 8192
/// overlap = 50.0
/// window = "rectangular"
/// kind = "power-density"
/// decibels = true
///
/// [search]
/// search_range = 50.0
/// low_freq = 3000.0
/// high_freq = 18000.0
///
/// [noise_floor]
/// moving_average = 0
/// remove_signals = true
/// peak_floor = 100.0
/// fit_curve = true
/// apply_fit = false
/// column = "decibel"
///
/// [snr]
/// unit_mode = "db-subtract"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Spectrum estimation.
    pub spectrum: SpectrumSection,
    /// Tone search and analysis band.
    pub search: SearchSection,
    /// Noise-floor estimation.
    pub noise_floor: NoiseFloorSection,
    /// SNR combination.
    pub snr: SnrSection,
}

/// `[spectrum]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SpectrumSection {
    /// FFT size in samples.
    pub fft_size: usize,
    /// Segment overlap in percent.
    pub overlap: f64,
    /// Segment taper name.
    pub window: String,
    /// `amplitude`, `power` or `power-density`.
    pub kind: String,
    /// Convert the spectrum to decibels.
    pub decibels: bool,
}

impl Default for SpectrumSection {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            overlap: 0.0,
            window: Window::Rectangular.name().to_string(),
            kind: SpectrumKind::PowerDensity.name().to_string(),
            decibels: true,
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSection {
    /// Half width of the peak search window in Hz.
    pub search_range: f64,
    /// Lower edge of the analysis band in Hz.
    pub low_freq: f64,
    /// Upper edge of the analysis band in Hz.
    pub high_freq: f64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            search_range: 50.0,
            low_freq: 0.0,
            high_freq: 20_000.0,
        }
    }
}

/// `[noise_floor]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseFloorSection {
    /// Moving-average window in bins, 0 disables smoothing.
    pub moving_average: isize,
    /// Flatten the spectrum around each peak before smoothing.
    pub remove_signals: bool,
    /// Half width in Hz of the flattened region.
    pub peak_floor: f64,
    /// Fit a quadratic to the estimated floor.
    pub fit_curve: bool,
    /// Use the fitted curve for SNR instead of the floor table.
    pub apply_fit: bool,
    /// Level column read from noise-floor files: `linear` or `decibel`.
    pub column: String,
}

impl Default for NoiseFloorSection {
    fn default() -> Self {
        Self {
            moving_average: 0,
            remove_signals: false,
            peak_floor: 50.0,
            fit_curve: false,
            apply_fit: false,
            column: FloorColumn::Decibel.name().to_string(),
        }
    }
}

/// `[snr]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SnrSection {
    /// `db-subtract` or `ratio-db`.
    pub unit_mode: String,
}

impl Default for SnrSection {
    fn default() -> Self {
        Self {
            unit_mode: UnitMode::DbSubtract.name().to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config: AnalysisConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        crate::record::write_toml(path.as_ref(), &self.to_toml()?)
    }

    /// Convert the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parsed window name.
    pub fn window(&self) -> ValidationResult<Window> {
        Window::from_name(&self.spectrum.window)
            .ok_or_else(|| ValidationError::unknown("spectrum.window", &self.spectrum.window))
    }

    /// Parsed spectrum kind.
    pub fn kind(&self) -> ValidationResult<SpectrumKind> {
        SpectrumKind::from_name(&self.spectrum.kind)
            .ok_or_else(|| ValidationError::unknown("spectrum.kind", &self.spectrum.kind))
    }

    /// Parsed floor column.
    pub fn floor_column(&self) -> ValidationResult<FloorColumn> {
        FloorColumn::from_name(&self.noise_floor.column)
            .ok_or_else(|| ValidationError::unknown("noise_floor.column", &self.noise_floor.column))
    }

    /// Parsed unit mode.
    pub fn unit_mode(&self) -> ValidationResult<UnitMode> {
        UnitMode::from_name(&self.snr.unit_mode)
            .ok_or_else(|| ValidationError::unknown("snr.unit_mode", &self.snr.unit_mode))
    }

    /// Check every field and return all problems found.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        let s = &self.spectrum;
        let q = &self.search;
        let n = &self.noise_floor;

        if s.fft_size < 2 {
            errors.push(ValidationError::out_of_range(
                "spectrum.fft_size",
                s.fft_size as f64,
                "must be at least 2",
            ));
        }
        if !(0.0..100.0).contains(&s.overlap) {
            errors.push(ValidationError::out_of_range(
                "spectrum.overlap",
                s.overlap,
                "must be in [0, 100)",
            ));
        }
        if q.search_range <= 0.0 || !q.search_range.is_finite() {
            errors.push(ValidationError::out_of_range(
                "search.search_range",
                q.search_range,
                "must be positive",
            ));
        }
        if q.low_freq < 0.0 {
            errors.push(ValidationError::out_of_range(
                "search.low_freq",
                q.low_freq,
                "must not be negative",
            ));
        }
        if q.high_freq <= q.low_freq {
            errors.push(ValidationError::out_of_range(
                "search.high_freq",
                q.high_freq,
                format!("must be above low_freq ({})", q.low_freq),
            ));
        }
        if n.remove_signals && n.peak_floor <= 0.0 {
            errors.push(ValidationError::out_of_range(
                "noise_floor.peak_floor",
                n.peak_floor,
                "must be positive",
            ));
        }
        if n.apply_fit && !n.fit_curve {
            errors.push(ValidationError::Inconsistent(
                "noise_floor.apply_fit needs noise_floor.fit_curve".to_string(),
            ));
        }

        let window = self.window();
        let kind = self.kind();
        let column = self.floor_column();
        let mode = self.unit_mode();
        for result in [window.map(|_| ()), kind.map(|_| ())] {
            if let Err(e) = result {
                errors.push(e);
            }
        }
        if let Err(e) = &column {
            errors.push(e.clone());
        }
        match &mode {
            Ok(mode) => {
                let wants_db = *mode == UnitMode::DbSubtract;
                if s.decibels != wants_db {
                    errors.push(ValidationError::Inconsistent(format!(
                        "unit mode {mode} needs spectrum.decibels = {wants_db}"
                    )));
                }
                if let Ok(column) = column
                    && column.scale() != mode.expected_scale()
                {
                    errors.push(ValidationError::Inconsistent(format!(
                        "unit mode {mode} reads {} floor levels, but noise_floor.column is '{}'",
                        mode.expected_scale(),
                        column.name()
                    )));
                }
            }
            Err(e) => errors.push(e.clone()),
        }

        ValidationError::collect(errors)
    }

    /// Validate and convert into analysis parameters for `toneset`.
    ///
    /// External floor tables and fit curves are loaded by the caller and
    /// attached to the result.
    pub fn to_params(&self, toneset: ToneSet) -> Result<AnalysisParams, ConfigError> {
        self.validate()?;
        Ok(AnalysisParams {
            spectrum: SpectrumParams {
                fft_size: self.spectrum.fft_size,
                overlap_percent: self.spectrum.overlap,
                kind: self.kind()?,
                decibels: self.spectrum.decibels,
                window: self.window()?,
            },
            search: SearchParams {
                toneset,
                search_range_hz: self.search.search_range,
                low_freq: self.search.low_freq,
                high_freq: self.search.high_freq,
            },
            noise_floor: NoiseFloorParams {
                moving_average: self.noise_floor.moving_average,
                remove_signals: self.noise_floor.remove_signals,
                peak_floor_hz: self.noise_floor.peak_floor,
                fit_curve: self.noise_floor.fit_curve,
                apply_fit: self.noise_floor.apply_fit,
            },
            unit_mode: self.unit_mode()?,
            external_floor: None,
            external_fit: None,
        })
    }
}
