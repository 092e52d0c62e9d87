//! Property-based tests for spectrum, peak search and floor smoothing.
//!
//! Uses proptest to check invariants over arbitrary inputs: spectrum shape,
//! smoothing identity and length, peak dominance within its window,
//! idempotent peak removal (overlapping regions included) and fit-file round trips.

use proptest::prelude::*;
use tonescope_analysis::{
    FitCurve, LevelScale, Peak, Spectrum, SpectrumEstimator, SpectrumKind, ToneSet, find_peaks,
    moving_average, remove_signal_peaks,
};

fn linear_axis(len: usize, step: f64) -> Vec<f64> {
    (0..len).map(|i| i as f64 * step).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Spectrum length is half the FFT size and the frequency axis ascends.
    #[test]
    fn spectrum_shape(
        exp in 3u32..10,
        extra in 0usize..2000,
        overlap in 0.0f64..95.0,
        decibels in any::<bool>(),
    ) {
        let fft_size = 1usize << exp;
        let samples: Vec<f32> = (0..fft_size + extra).map(|i| ((i * 7919) % 101) as f32 / 101.0 - 0.5).collect();
        let spectrum = SpectrumEstimator::new(fft_size)
            .with_overlap(overlap)
            .with_decibels(decibels)
            .estimate(&samples, 44100)
            .unwrap();

        prop_assert_eq!(spectrum.len(), fft_size / 2);
        prop_assert!(spectrum.frequencies.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(spectrum.magnitudes.iter().all(|m| m.is_finite()));
    }

    /// Non-positive windows leave the input untouched.
    #[test]
    fn moving_average_identity(
        values in prop::collection::vec(-100.0f64..100.0, 0..200),
        window in -10isize..=0,
    ) {
        prop_assert_eq!(moving_average(&values, window), values);
    }

    /// Smoothing never changes the length.
    #[test]
    fn moving_average_keeps_length(
        values in prop::collection::vec(-100.0f64..100.0, 0..200),
        window in 1isize..300,
    ) {
        prop_assert_eq!(moving_average(&values, window).len(), values.len());
    }

    /// A found peak lies inside its window and dominates every bin there.
    #[test]
    fn peak_dominates_its_window(
        magnitudes in prop::collection::vec(-120.0f64..0.0, 16..256),
        tone in 0u32..2560,
        range in 1.0f64..200.0,
    ) {
        let spectrum = Spectrum {
            frequencies: linear_axis(magnitudes.len(), 10.0),
            magnitudes,
            kind: SpectrumKind::Power,
            scale: LevelScale::Decibel,
        };
        let search = find_peaks(&spectrum, &ToneSet::from(vec![tone]), range);
        let low = f64::from(tone) - range;
        let high = f64::from(tone) + range;

        if let Some(peak) = search.peaks.first() {
            prop_assert!(peak.frequency >= low && peak.frequency <= high);
            for (f, m) in spectrum.frequencies.iter().zip(&spectrum.magnitudes) {
                if *f >= low && *f <= high {
                    prop_assert!(peak.intensity >= *m);
                }
            }
        } else {
            prop_assert!(spectrum.frequencies.iter().all(|f| *f < low || *f > high));
            prop_assert_eq!(search.warnings.len(), 1);
        }
    }

    /// Removing the same peaks twice changes nothing the second time, even
    /// when their regions overlap.
    #[test]
    fn peak_removal_is_idempotent(
        levels in prop::collection::vec(-120.0f64..0.0, 64..256),
        peak_bins in prop::collection::vec(0usize..64, 1..6),
        half_width in 5.0f64..60.0,
    ) {
        let frequencies = linear_axis(levels.len(), 10.0);
        let peaks: Vec<Peak> = peak_bins
            .iter()
            .map(|&bin| Peak { frequency: frequencies[bin], intensity: 0.0 })
            .collect();

        let once = remove_signal_peaks(&frequencies, &levels, &peaks, half_width);
        let twice = remove_signal_peaks(&frequencies, &once, &peaks, half_width);
        prop_assert_eq!(once, twice);
    }

    /// Coefficients survive the text format within 1e-6 relative.
    #[test]
    fn fit_text_roundtrip(
        a in -1e-3f64..1e-3,
        b in -1.0f64..1.0,
        c in -200.0f64..200.0,
    ) {
        let curve = FitCurve::new([a, b, c]);
        let loaded = FitCurve::from_text(&curve.to_text()).unwrap();
        for (x, y) in curve.coefficients().iter().zip(loaded.coefficients()) {
            prop_assert!((x - y).abs() <= 1e-6 * x.abs());
        }
    }
}
