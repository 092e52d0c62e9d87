//! Integration tests for tonescope-analysis.
//!
//! Tests drive the public API end to end with synthetic tones in noise and
//! with table files written to temporary directories.

use std::f32::consts::PI;

use tonescope_analysis::{
    AnalysisError, AnalysisParams, AnalysisWarning, CsvPlotWriter, FitCurve, FloorColumn,
    LevelScale, NoiseFloor, NoiseFloorParams, SearchParams, SpectrumEstimator, SpectrumKind,
    SpectrumPlotter, ToneSet, UnitMode, analyze_channel, compute_snr, find_peaks,
    remove_signal_peaks, save_snr_table, save_tone_floor_table, survey_tone_floor,
};

const SAMPLE_RATE: u32 = 44_100;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Uniform white noise in `[-amplitude, amplitude]`.
fn noise(len: usize, amplitude: f32, seed: u32) -> Vec<f32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amplitude * (state as i32 as f32) / (i32::MAX as f32)
        })
        .collect()
}

/// Sum of sines at `tones` with unit amplitude, plus noise.
fn tones_in_noise(tones: &[f32], len: usize, noise_amplitude: f32) -> Vec<f32> {
    let mut signal = noise(len, noise_amplitude, 0x1234_5678);
    for &freq in tones {
        for (i, s) in signal.iter_mut().enumerate() {
            *s += (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin();
        }
    }
    signal
}

fn params_for(tones: Vec<u32>) -> AnalysisParams {
    AnalysisParams {
        search: SearchParams {
            toneset: ToneSet::from(tones),
            ..SearchParams::default()
        },
        noise_floor: NoiseFloorParams {
            remove_signals: true,
            // Rectangular-window leakage of a unit tone stays above the noise
            // for ~300 Hz, so narrower removal measures leakage, not the floor
            peak_floor_hz: 300.0,
            ..NoiseFloorParams::default()
        },
        ..AnalysisParams::default()
    }
}

// ===========================================================================
// 1. End-to-end scenarios
// ===========================================================================

#[test]
fn single_tone_snr_above_twenty_db() {
    let signal = tones_in_noise(&[1000.0], SAMPLE_RATE as usize, 0.01);
    let result = analyze_channel(&signal, SAMPLE_RATE, &params_for(vec![1000])).unwrap();

    let peak = result.peaks.peaks[0];
    assert!(
        (peak.frequency - 1000.0).abs() < 22.0,
        "peak at {} Hz should be within one bin of 1000 Hz",
        peak.frequency
    );
    let snr = result.report.results[0].snr;
    assert!(snr > 20.0, "SNR {snr} dB should exceed 20 dB");
}

#[test]
fn multi_tone_report_keeps_toneset_order() {
    let signal = tones_in_noise(&[800.0, 3400.0, 6400.0], SAMPLE_RATE as usize, 0.01);
    let result = analyze_channel(&signal, SAMPLE_RATE, &params_for(vec![6400, 800, 3400])).unwrap();

    let freqs: Vec<f64> = result.peaks.peaks.iter().map(|p| p.frequency).collect();
    assert_eq!(freqs.len(), 3);
    assert!((freqs[0] - 6400.0).abs() < 22.0);
    assert!((freqs[1] - 800.0).abs() < 22.0);
    assert!((freqs[2] - 3400.0).abs() < 22.0);
    for row in &result.report.results {
        assert!(row.snr > 20.0, "row {row:?}");
    }
}

#[test]
fn tone_above_nyquist_is_skipped_with_warning() {
    let signal = tones_in_noise(&[1000.0], 16384, 0.01);
    let mut params = params_for(vec![1000, 30000]);
    params.search.high_freq = 40_000.0;
    let result = analyze_channel(&signal, SAMPLE_RATE, &params).unwrap();

    assert_eq!(result.peaks.peaks.len(), 1);
    assert_eq!(result.report.results.len(), 1);
    let warnings: Vec<_> = result.warnings().copied().collect();
    assert_eq!(warnings, vec![AnalysisWarning::ToneNotFound { tone: 30000 }]);
}

#[test]
fn default_toneset_finds_every_tone_below_nyquist() {
    let tones: Vec<f32> = ToneSet::default().tones().iter().map(|&t| t as f32).collect();
    let signal = tones_in_noise(&tones, SAMPLE_RATE as usize, 0.01);
    let mut params = params_for(ToneSet::default().tones().to_vec());
    params.noise_floor.peak_floor_hz = 40.0;
    let result = analyze_channel(&signal, SAMPLE_RATE, &params).unwrap();

    assert_eq!(result.peaks.peaks.len(), 11);
    assert!(result.peaks.warnings.is_empty());
}

#[test]
fn close_tone_pair_removal_is_stable() {
    // 9400 and 9500 Hz sit closer than twice the removal width
    let signal = tones_in_noise(&[9400.0, 9500.0], SAMPLE_RATE as usize, 0.01);
    let spectrum = SpectrumEstimator::new(2048)
        .with_kind(SpectrumKind::PowerDensity)
        .with_decibels(true)
        .estimate(&signal, SAMPLE_RATE)
        .unwrap();
    let peaks = find_peaks(&spectrum, &ToneSet::default(), 50.0);

    let once = remove_signal_peaks(
        &spectrum.frequencies,
        &spectrum.magnitudes,
        &peaks.peaks,
        100.0,
    );
    let twice = remove_signal_peaks(&spectrum.frequencies, &once, &peaks.peaks, 100.0);
    assert_eq!(once, twice);

    // The merged run between the pair is one straight line below both tones
    let pair: Vec<f64> = peaks
        .peaks
        .iter()
        .filter(|p| p.frequency > 9300.0 && p.frequency < 9600.0)
        .map(|p| p.intensity)
        .collect();
    assert_eq!(pair.len(), 2);
    for (f, level) in spectrum.frequencies.iter().zip(&once) {
        if (9400.0..=9500.0).contains(f) {
            assert!(*level < pair[0] && *level < pair[1], "{f} Hz at {level} dB");
        }
    }
}

// ===========================================================================
// 2. Floor tables and fits on disk
// ===========================================================================

#[test]
fn surveyed_floor_drives_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let floor_path = dir.path().join("floor.txt");

    // Background-only recording
    let background = noise(SAMPLE_RATE as usize, 0.01, 0xdead_beef);
    let spectrum = SpectrumEstimator::new(2048)
        .with_kind(SpectrumKind::Amplitude)
        .estimate(&background, SAMPLE_RATE)
        .unwrap();
    let survey = survey_tone_floor(&spectrum, &ToneSet::from(vec![1000, 3400]), 50.0).unwrap();
    save_tone_floor_table(&floor_path, &survey, 0).unwrap();

    let loaded = NoiseFloor::load(&floor_path, FloorColumn::Decibel).unwrap();
    assert!(loaded.skipped.is_empty());
    assert_eq!(loaded.value.len(), 2);
    assert_eq!(loaded.value.scale(), LevelScale::Decibel);

    // Same kind and scale as the survey so the levels compare directly
    let signal = tones_in_noise(&[1000.0], SAMPLE_RATE as usize, 0.01);
    let mut params = params_for(vec![1000]);
    params.spectrum.kind = SpectrumKind::Amplitude;
    params.external_floor = Some(loaded.value);
    let result = analyze_channel(&signal, SAMPLE_RATE, &params).unwrap();

    let row = result.report.results[0];
    assert_eq!(row.matched_frequency, 1000);
    assert!(row.snr > 20.0, "snr = {}", row.snr);
}

#[test]
fn fit_from_one_channel_applies_to_another() {
    let dir = tempfile::tempdir().unwrap();
    let fit_path = dir.path().join("left_fit_coeff.txt");

    let left = tones_in_noise(&[1000.0], SAMPLE_RATE as usize, 0.01);
    let mut params = params_for(vec![1000]);
    params.noise_floor.fit_curve = true;
    let left_result = analyze_channel(&left, SAMPLE_RATE, &params).unwrap();
    let curve = left_result.fit().unwrap();
    curve.save(&fit_path).unwrap();

    let right = tones_in_noise(&[1000.0], SAMPLE_RATE as usize, 0.02);
    let mut right_params = params_for(vec![1000]);
    right_params.external_fit = Some(FitCurve::load(&fit_path).unwrap());
    let right_result = analyze_channel(&right, SAMPLE_RATE, &right_params).unwrap();

    let row = right_result.report.results[0];
    let expected = curve.evaluate(right_result.peaks.peaks[0].frequency);
    assert!((row.noise_floor_value - expected).abs() <= 1e-6 * expected.abs());
}

#[test]
fn result_table_and_plot_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let signal = tones_in_noise(&[1000.0], 8192, 0.01);
    let result = analyze_channel(&signal, SAMPLE_RATE, &params_for(vec![1000])).unwrap();

    let table = dir.path().join("out.txt");
    save_snr_table(&table, &result.report, SpectrumKind::PowerDensity).unwrap();
    let text = std::fs::read_to_string(&table).unwrap();
    assert!(text.starts_with("# Frequency [Hz], Intensity [dB]"));
    assert_eq!(text.lines().count(), 2);

    let plot = dir.path().join("out_spectrum.csv");
    let mut writer = CsvPlotWriter::new(&plot);
    writer.plot(&result.plot_data("out")).unwrap();
    let csv = std::fs::read_to_string(&plot).unwrap();
    assert!(csv.starts_with("# out\nfrequency_hz,spectrum,noise_floor,fitted,peak\n"));
}

// ===========================================================================
// 3. Error paths
// ===========================================================================

#[test]
fn empty_floor_table_is_an_error_not_a_panic() {
    let signal = tones_in_noise(&[1000.0], 8192, 0.01);
    let spectrum = SpectrumEstimator::new(2048)
        .with_decibels(true)
        .estimate(&signal, SAMPLE_RATE)
        .unwrap();
    let peaks = find_peaks(&spectrum, &ToneSet::from(vec![1000]), 50.0);
    let floor = NoiseFloor::parse("# only comments\n\n", FloorColumn::Decibel).value;

    let err = compute_snr(&peaks, &floor, 50.0, UnitMode::DbSubtract, None).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyNoiseFloor));
}

#[test]
fn linear_floor_with_db_peaks_is_rejected() {
    let floor = NoiseFloor::parse("1000,0.001,-60\n", FloorColumn::Linear).value;
    let mut params = params_for(vec![1000]);
    params.external_floor = Some(floor);
    let signal = tones_in_noise(&[1000.0], 8192, 0.01);

    let err = analyze_channel(&signal, SAMPLE_RATE, &params).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::ScaleMismatch {
            mode: UnitMode::DbSubtract,
            found: LevelScale::Linear,
            ..
        }
    ));
}

#[test]
fn invalid_overlap_is_rejected() {
    let err = SpectrumEstimator::new(1024)
        .with_overlap(100.0)
        .estimate(&[0.0; 4096], SAMPLE_RATE)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidParameter(_)));
}
