//! One-channel analysis run from explicit parameters.
//!
//! [`analyze_channel`] chains the stages in a fixed order:
//!
//! 1. estimate the averaged spectrum of the whole channel
//! 2. search for tone peaks inside the analysis band
//! 3. estimate the floor on the full spectrum (peak removal, then smoothing),
//!    then keep the analysis band and fit or apply a curve
//! 4. look up each peak in the floor table (estimated or loaded) and
//!    combine the levels into an SNR

use crate::error::{AnalysisWarning, Result};
use crate::export::PlotData;
use crate::fft::Window;
use crate::fit::FitCurve;
use crate::noise_floor::{
    FitMode, NoiseFloor, NoiseFloorOptions, NoiseFloorSpectrum, estimate_noise_floor,
};
use crate::peaks::{PeakSearch, ToneSet, find_peaks};
use crate::snr::{SnrReport, UnitMode, compute_snr};
use crate::spectrum::{Spectrum, SpectrumEstimator, SpectrumKind};

/// Spectrum estimation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumParams {
    /// FFT size in samples.
    pub fft_size: usize,
    /// Segment overlap in percent.
    pub overlap_percent: f64,
    /// Per-bin quantity.
    pub kind: SpectrumKind,
    /// Output in decibels instead of linear levels.
    pub decibels: bool,
    /// Segment taper.
    pub window: Window,
}

impl Default for SpectrumParams {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            overlap_percent: 0.0,
            kind: SpectrumKind::PowerDensity,
            decibels: true,
            window: Window::Rectangular,
        }
    }
}

impl SpectrumParams {
    /// Build the configured estimator.
    pub fn estimator(&self) -> SpectrumEstimator {
        SpectrumEstimator::new(self.fft_size)
            .with_overlap(self.overlap_percent)
            .with_kind(self.kind)
            .with_decibels(self.decibels)
            .with_window(self.window)
    }
}

/// Tone search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Expected tones.
    pub toneset: ToneSet,
    /// Half width of the peak search window and the floor match tolerance, in Hz.
    pub search_range_hz: f64,
    /// Lower edge of the analysis band in Hz.
    pub low_freq: f64,
    /// Upper edge of the analysis band in Hz.
    pub high_freq: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            toneset: ToneSet::default(),
            search_range_hz: 50.0,
            low_freq: 0.0,
            high_freq: 20_000.0,
        }
    }
}

/// Noise-floor settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloorParams {
    /// Moving-average window in bins, `<= 0` disables smoothing.
    pub moving_average: isize,
    /// Flatten the spectrum around each peak before smoothing.
    pub remove_signals: bool,
    /// Half width in Hz of the flattened region.
    pub peak_floor_hz: f64,
    /// Fit a quadratic to the estimated floor.
    pub fit_curve: bool,
    /// Use the freshly fitted curve instead of the floor table for SNR.
    pub apply_fit: bool,
}

impl Default for NoiseFloorParams {
    fn default() -> Self {
        Self {
            moving_average: 0,
            remove_signals: false,
            peak_floor_hz: 50.0,
            fit_curve: false,
            apply_fit: false,
        }
    }
}

/// Everything [`analyze_channel`] needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisParams {
    /// Spectrum estimation.
    pub spectrum: SpectrumParams,
    /// Tone search and analysis band.
    pub search: SearchParams,
    /// Floor estimation.
    pub noise_floor: NoiseFloorParams,
    /// SNR combination rule.
    pub unit_mode: UnitMode,
    /// Loaded floor table used instead of the estimated one.
    pub external_floor: Option<NoiseFloor>,
    /// Loaded curve applied instead of refitting; also drives SNR.
    pub external_fit: Option<FitCurve>,
}

/// Outputs of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAnalysis {
    /// Full averaged spectrum.
    pub spectrum: Spectrum,
    /// Peaks found inside the analysis band.
    pub peaks: PeakSearch,
    /// Per-bin floor estimate inside the analysis band.
    pub noise_floor: NoiseFloorSpectrum,
    /// Floor table the SNR lookup used.
    pub floor_table: NoiseFloor,
    /// SNR rows.
    pub report: SnrReport,
}

impl ChannelAnalysis {
    /// Curve fitted to this channel, if fitting was requested.
    pub fn fit(&self) -> Option<FitCurve> {
        self.noise_floor.fit
    }

    /// All non-fatal conditions raised during the run.
    pub fn warnings(&self) -> impl Iterator<Item = &AnalysisWarning> {
        self.peaks.warnings.iter().chain(&self.report.warnings)
    }

    /// Bundle the results for a [`crate::export::SpectrumPlotter`].
    pub fn plot_data<'a>(&'a self, title: &'a str) -> PlotData<'a> {
        PlotData {
            title,
            spectrum: &self.spectrum,
            peaks: &self.peaks.peaks,
            noise_floor_spectrum: &self.noise_floor,
            noise_floor_table: &self.floor_table,
        }
    }
}

/// Run the full analysis on one channel.
pub fn analyze_channel(
    samples: &[f32],
    sample_rate: u32,
    params: &AnalysisParams,
) -> Result<ChannelAnalysis> {
    let search = &params.search;
    let floor_params = &params.noise_floor;

    let spectrum = params.spectrum.estimator().estimate(samples, sample_rate)?;
    let band = spectrum.band(search.low_freq, search.high_freq);
    let peaks = find_peaks(&band, &search.toneset, search.search_range_hz);

    let fit = match (params.external_fit, floor_params.fit_curve) {
        (Some(curve), _) => FitMode::Apply(curve),
        (None, true) => FitMode::Compute,
        (None, false) => FitMode::None,
    };
    let options = NoiseFloorOptions {
        moving_average: floor_params.moving_average,
        remove_signals: floor_params
            .remove_signals
            .then_some(floor_params.peak_floor_hz),
        band: Some((search.low_freq, search.high_freq)),
        fit,
    };
    let noise_floor = estimate_noise_floor(&spectrum, &peaks.peaks, &options)?;

    let floor_table = match &params.external_floor {
        Some(table) => table.clone(),
        None => noise_floor.to_table(),
    };

    let snr_fit = params.external_fit.or_else(|| {
        if floor_params.apply_fit {
            noise_floor.fit
        } else {
            None
        }
    });
    let report = compute_snr(
        &peaks,
        &floor_table,
        search.search_range_hz,
        params.unit_mode,
        snr_fit.as_ref(),
    )?;

    tracing::debug!(
        peaks = peaks.peaks.len(),
        floor_entries = floor_table.len(),
        "channel analysis complete"
    );

    Ok(ChannelAnalysis {
        spectrum,
        peaks,
        noise_floor,
        floor_table,
        report,
    })
}
