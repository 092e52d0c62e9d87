//! Per-tone noise-floor table from a background recording.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tonescope_analysis::{
    CsvPlotWriter, LevelScale, NoiseFloor, NoiseFloorOptions, PlotData, Spectrum, SpectrumKind,
    SpectrumPlotter, estimate_noise_floor, save_tone_floor_table, survey_tone_floor,
};
use tonescope_config::ParameterRecord;

use super::common::{CommonArgs, load_channels, with_suffix};

#[derive(Args, Debug)]
pub struct NoiseFloorArgs {
    /// Background (tone-free) WAV recording, at least one FFT size long
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Output table (defaults to <stem>.txt)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip the plot data file
    #[arg(long)]
    no_plot: bool,
}

pub fn run(args: NoiseFloorArgs) -> anyhow::Result<()> {
    let mut config = args.common.load_config()?;
    // The table stores linear amplitudes next to their 20*log10 values
    config.spectrum.kind = SpectrumKind::Amplitude.name().to_string();
    config.validate().context("invalid analysis settings")?;

    let toneset = args.common.load_toneset()?;
    let mut params = config.to_params(toneset)?;
    // The survey averages linear levels; the record keeps the scale it ran on
    params.spectrum.decibels = false;
    config.spectrum.decibels = false;
    let moving_average = params.noise_floor.moving_average;

    let (channels, spec) = load_channels(&args.input, false, &args.common)?;
    let samples = &channels[0].samples;
    println!(
        "Measuring noise floor of {} ({:.2}s, {} Hz)...",
        args.input.display(),
        samples.len() as f64 / f64::from(spec.sample_rate),
        spec.sample_rate
    );

    let spectrum = params
        .spectrum
        .estimator()
        .estimate(samples, spec.sample_rate)
        .with_context(|| format!("estimating spectrum of {}", args.input.display()))?;

    let smoothed = estimate_noise_floor(
        &spectrum,
        &[],
        &NoiseFloorOptions {
            moving_average,
            ..NoiseFloorOptions::default()
        },
    )?;
    let smoothed_spectrum = Spectrum {
        frequencies: smoothed.frequencies.clone(),
        magnitudes: smoothed.levels.clone(),
        kind: spectrum.kind,
        scale: spectrum.scale,
    };

    let survey = survey_tone_floor(
        &smoothed_spectrum,
        &params.search.toneset,
        params.search.search_range_hz,
    )?;

    let stem = args.common.output_stem(&args.input);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| with_suffix(&stem, ".txt"));
    save_tone_floor_table(&output, &survey, moving_average)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("\n  {:>10} {:>14} {:>10}", "Tone (Hz)", "Linear", "dB");
    println!("  {:-<10} {:-<14} {:-<10}", "", "", "");
    for level in &survey.levels {
        println!("  {:>10} {:>14.6e} {:>10.2}", level.tone, level.linear, level.db);
    }
    for warning in &survey.warnings {
        println!("  warning: {warning}");
    }
    println!("\nNoise floor saved to {}", output.display());

    if !args.no_plot {
        let table = NoiseFloor::from_entries(
            LevelScale::Linear,
            survey
                .levels
                .iter()
                .map(|l| (i64::from(l.tone), l.linear)),
        );
        let title = format!("{} (moving average: {moving_average} points)", stem.display());
        let data = PlotData {
            title: &title,
            spectrum: &spectrum,
            peaks: &[],
            noise_floor_spectrum: &smoothed,
            noise_floor_table: &table,
        };
        CsvPlotWriter::new(with_suffix(&stem, "_spectrum.csv")).plot(&data)?;
    }

    let mut record = ParameterRecord::new("noise-floor", config)
        .with_file("input", &args.input)
        .with_file("output", &output);
    if let Some(path) = &args.common.toneset {
        record = record.with_file("toneset", path);
    }
    record.save(ParameterRecord::path_for(&stem))?;

    Ok(())
}
