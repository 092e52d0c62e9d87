//! Text export of analysis results.
//!
//! - SNR result tables (`# Frequency [Hz], Intensity [dB], ...`)
//! - Noise-floor tables measured on background recordings
//! - Plot data for an external renderer, via [`SpectrumPlotter`]
//!
//! Files are written to a temporary file next to the destination and then
//! renamed over it, so readers never see a half-written file.

use crate::error::Result;
use crate::noise_floor::{NoiseFloor, NoiseFloorSpectrum, ToneFloorSurvey};
use crate::peaks::Peak;
use crate::snr::{SnrReport, UnitMode};
use crate::spectrum::{Spectrum, SpectrumKind};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header line of an SNR result table.
pub const SNR_TABLE_HEADER: &str =
    "# Frequency [Hz], Intensity [dB], Noise floor [dB], Signal-to-Noise Ratio [dB]";

/// Write `contents` to `path` through a temporary file in the same directory.
///
/// Missing parent directories are created first.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn fmt_level(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.6}")
    }
}

/// Write an SNR report as a comma-separated table.
///
/// Linear reports are converted to dB with `kind`'s factor so every table
/// reads in dB regardless of the unit mode that produced it.
pub fn write_snr_table<W: Write>(
    writer: &mut W,
    report: &SnrReport,
    kind: SpectrumKind,
) -> std::io::Result<()> {
    writeln!(writer, "{SNR_TABLE_HEADER}")?;
    for row in &report.results {
        let (intensity, floor) = match report.mode {
            UnitMode::DbSubtract => (row.intensity, row.noise_floor_value),
            UnitMode::RatioDb => (kind.to_db(row.intensity), kind.to_db(row.noise_floor_value)),
        };
        writeln!(
            writer,
            "{},{},{},{}",
            row.matched_frequency,
            fmt_level(intensity),
            fmt_level(floor),
            fmt_level(row.snr)
        )?;
    }
    Ok(())
}

/// Save an SNR report table to `path`.
pub fn save_snr_table(path: impl AsRef<Path>, report: &SnrReport, kind: SpectrumKind) -> Result<()> {
    let mut buf = Vec::new();
    write_snr_table(&mut buf, report, kind)?;
    write_atomic(path, &buf)?;
    Ok(())
}

/// Write a per-tone floor survey in the noise-floor file format.
pub fn write_tone_floor_table<W: Write>(
    writer: &mut W,
    survey: &ToneFloorSurvey,
    moving_average: isize,
) -> std::io::Result<()> {
    writeln!(writer, "# Frequency (Hz),Linear Level,dB Level")?;
    writeln!(writer, "# Moving Average: {moving_average} points")?;
    for level in &survey.levels {
        writeln!(writer, "{}, {}, {}", level.tone, level.linear, level.db)?;
    }
    Ok(())
}

/// Save a per-tone floor survey to `path`.
pub fn save_tone_floor_table(
    path: impl AsRef<Path>,
    survey: &ToneFloorSurvey,
    moving_average: isize,
) -> Result<()> {
    let mut buf = Vec::new();
    write_tone_floor_table(&mut buf, survey, moving_average)?;
    write_atomic(path, &buf)?;
    Ok(())
}

/// Everything a renderer needs to draw one channel's analysis.
#[derive(Debug, Clone, Copy)]
pub struct PlotData<'a> {
    /// Plot title, usually the output file stem.
    pub title: &'a str,
    /// Full spectrum.
    pub spectrum: &'a Spectrum,
    /// Detected peaks.
    pub peaks: &'a [Peak],
    /// Estimated floor and optional fitted curve.
    pub noise_floor_spectrum: &'a NoiseFloorSpectrum,
    /// Floor table used for SNR (estimated or loaded).
    pub noise_floor_table: &'a NoiseFloor,
}

/// Receives plot data; rendering lives outside this crate.
pub trait SpectrumPlotter {
    /// Render or store one plot.
    fn plot(&mut self, data: &PlotData<'_>) -> Result<()>;
}

/// Writes plot data as CSV for an external plotting tool.
///
/// The first section has one row per spectrum bin with the floor, fitted
/// curve and a peak marker where present; the second lists the floor table.
#[derive(Debug, Clone)]
pub struct CsvPlotWriter {
    path: PathBuf,
}

impl CsvPlotWriter {
    /// Write to `path` on every [`SpectrumPlotter::plot`] call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render plot data to CSV text.
    pub fn render<W: Write>(writer: &mut W, data: &PlotData<'_>) -> std::io::Result<()> {
        let floor = data.noise_floor_spectrum;
        let cell = |v: Option<f64>| v.map(fmt_level).unwrap_or_default();

        writeln!(writer, "# {}", data.title)?;
        writeln!(writer, "frequency_hz,spectrum,noise_floor,fitted,peak")?;

        let mut j = 0;
        for (&f, &level) in data.spectrum.frequencies.iter().zip(&data.spectrum.magnitudes) {
            while j < floor.frequencies.len() && floor.frequencies[j] < f {
                j += 1;
            }
            let on_floor = j < floor.frequencies.len() && floor.frequencies[j] == f;
            let floor_level = on_floor.then(|| floor.levels[j]);
            let fitted = floor
                .fitted
                .as_ref()
                .filter(|_| on_floor)
                .map(|curve| curve[j]);
            let peak = data
                .peaks
                .iter()
                .find(|p| p.frequency == f)
                .map(|p| p.intensity);

            writeln!(
                writer,
                "{f},{},{},{},{}",
                fmt_level(level),
                cell(floor_level),
                cell(fitted),
                cell(peak)
            )?;
        }

        writeln!(writer, "# noise floor table ({})", data.noise_floor_table.scale())?;
        writeln!(writer, "frequency_hz,level")?;
        for (f, level) in data.noise_floor_table.iter() {
            writeln!(writer, "{f},{}", fmt_level(level))?;
        }
        Ok(())
    }
}

impl SpectrumPlotter for CsvPlotWriter {
    fn plot(&mut self, data: &PlotData<'_>) -> Result<()> {
        let mut buf = Vec::new();
        Self::render(&mut buf, data)?;
        write_atomic(&self.path, &buf)?;
        tracing::info!(path = %self.path.display(), "wrote plot data");
        Ok(())
    }
}
