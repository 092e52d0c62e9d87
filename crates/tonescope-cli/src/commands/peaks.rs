//! Tone peak search and SNR measurement.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tonescope_analysis::{
    ChannelAnalysis, CsvPlotWriter, FitCurve, NoiseFloor, SpectrumKind, SpectrumPlotter,
    UnitMode, analyze_channel, save_snr_table,
};
use tonescope_config::{AnalysisConfig, ParameterRecord};

use super::common::{Channel, CommonArgs, load_channels, with_suffix};

#[derive(Args, Debug)]
pub struct PeaksArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Noise-floor table used instead of the estimated floor
    #[arg(short, long, value_name = "FILE")]
    noise_floor: Option<PathBuf>,

    /// Saved fit coefficients applied instead of refitting
    #[arg(long, value_name = "FILE")]
    fit_coeff: Option<PathBuf>,

    /// Fit a quadratic curve to the estimated floor
    #[arg(long)]
    fit_curve: bool,

    /// Measure SNR against the fitted curve (implies --fit-curve)
    #[arg(long)]
    apply_fit: bool,

    /// Flatten the spectrum around each peak before estimating the floor
    #[arg(long)]
    remove_signals: bool,

    /// Half width in Hz of the flattened region
    #[arg(long)]
    peak_floor: Option<f64>,

    /// Lower edge of the analysis band in Hz
    #[arg(long)]
    low_freq: Option<f64>,

    /// Upper edge of the analysis band in Hz
    #[arg(long)]
    high_freq: Option<f64>,

    /// SNR rule: db-subtract, or ratio-db on linear levels
    #[arg(long)]
    unit_mode: Option<String>,

    /// Analyze each channel separately
    #[arg(short, long)]
    stereo: bool,

    /// Skip the plot data file
    #[arg(long)]
    no_plot: bool,

    /// Also write the results as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

impl PeaksArgs {
    fn config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = self.common.load_config()?;
        let n = &mut config.noise_floor;
        n.fit_curve |= self.fit_curve || self.apply_fit;
        n.apply_fit |= self.apply_fit;
        n.remove_signals |= self.remove_signals;
        if let Some(v) = self.peak_floor {
            n.peak_floor = v;
        }
        if let Some(v) = self.low_freq {
            config.search.low_freq = v;
        }
        if let Some(v) = self.high_freq {
            config.search.high_freq = v;
        }
        if let Some(name) = &self.unit_mode {
            let mode = UnitMode::from_name(name)
                .with_context(|| format!("unknown unit mode '{name}'"))?;
            // The mode fixes the level scale of both the spectrum and the floor file
            config.snr.unit_mode = mode.name().to_string();
            config.spectrum.decibels = mode == UnitMode::DbSubtract;
            config.noise_floor.column = match mode {
                UnitMode::DbSubtract => "decibel",
                UnitMode::RatioDb => "linear",
            }
            .to_string();
        }
        config.validate().context("invalid analysis settings")?;
        Ok(config)
    }
}

pub fn run(args: PeaksArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let toneset = args.common.load_toneset()?;
    tracing::debug!(tones = ?toneset.tones(), "toneset");
    let mut params = config.to_params(toneset)?;

    if let Some(path) = &args.noise_floor {
        let parsed = NoiseFloor::load(path, config.floor_column()?)
            .with_context(|| format!("loading noise floor {}", path.display()))?;
        if !parsed.skipped.is_empty() {
            println!(
                "Skipped {} malformed line(s) in {}",
                parsed.skipped.len(),
                path.display()
            );
        }
        params.external_floor = Some(parsed.value);
    }
    if let Some(path) = &args.fit_coeff {
        let curve = FitCurve::load(path)
            .with_context(|| format!("loading fit coefficients {}", path.display()))?;
        params.external_fit = Some(curve);
    }

    let (channels, spec) = load_channels(&args.input, args.stereo, &args.common)?;
    println!(
        "Analyzing {} ({} channel(s), {} Hz)...",
        args.input.display(),
        channels.len(),
        spec.sample_rate
    );

    let pb = ProgressBar::new(channels.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} channels")?
            .progress_chars("##-"),
    );

    let results: Vec<anyhow::Result<ChannelAnalysis>> = std::thread::scope(|s| {
        let handles: Vec<_> = channels
            .iter()
            .map(|channel| {
                let params = &params;
                let pb = &pb;
                s.spawn(move || {
                    let result = analyze_channel(&channel.samples, spec.sample_rate, params)
                        .with_context(|| format!("analyzing channel '{}'", channel.suffix));
                    pb.inc(1);
                    result
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("channel analysis panicked")))
            })
            .collect()
    });
    pb.finish_and_clear();

    let stem = args.common.output_stem(&args.input);
    let kind = params.spectrum.kind;
    let mut json_channels = Vec::new();

    for (channel, result) in channels.iter().zip(results) {
        let analysis = result?;
        let base = with_suffix(&stem, &channel.suffix);
        write_channel_outputs(&base, &analysis, kind, !args.no_plot, params.external_fit.is_none())?;
        print_report(channel, &analysis);
        json_channels.push(channel_json(channel, &analysis));
    }

    if let Some(json_path) = &args.json {
        let json = serde_json::json!({
            "input": args.input.display().to_string(),
            "sample_rate": spec.sample_rate,
            "unit_mode": params.unit_mode.name(),
            "channels": json_channels,
        });
        tonescope_analysis::write_atomic(json_path, serde_json::to_string_pretty(&json)?.as_bytes())?;
        println!("Results saved to {}", json_path.display());
    }

    let mut record = ParameterRecord::new("peaks", config).with_file("input", &args.input);
    for (role, path) in [
        ("toneset", &args.common.toneset),
        ("noise_floor", &args.noise_floor),
        ("fit_coeff", &args.fit_coeff),
    ] {
        if let Some(path) = path {
            record = record.with_file(role, path);
        }
    }
    record.save(ParameterRecord::path_for(&stem))?;

    Ok(())
}

fn write_channel_outputs(
    base: &Path,
    analysis: &ChannelAnalysis,
    kind: SpectrumKind,
    plot: bool,
    save_fit: bool,
) -> anyhow::Result<()> {
    let table = with_suffix(base, ".txt");
    save_snr_table(&table, &analysis.report, kind)
        .with_context(|| format!("writing {}", table.display()))?;
    tracing::info!(path = %table.display(), "wrote results");

    if save_fit && let Some(curve) = analysis.fit() {
        let path = with_suffix(base, "_fit_coeff.txt");
        curve
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote fit coefficients");
    }

    if plot {
        let path = with_suffix(base, "_spectrum.csv");
        let title = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        CsvPlotWriter::new(path).plot(&analysis.plot_data(&title))?;
    }
    Ok(())
}

fn print_report(channel: &Channel, analysis: &ChannelAnalysis) {
    let label = if channel.suffix.is_empty() {
        "mono"
    } else {
        channel.suffix.trim_start_matches('_')
    };
    println!("\nChannel: {label}");
    println!(
        "  {:>10} {:>12} {:>14} {:>10}",
        "Freq (Hz)", "Intensity", "Noise floor", "SNR (dB)"
    );
    println!("  {:-<10} {:-<12} {:-<14} {:-<10}", "", "", "", "");
    for row in &analysis.report.results {
        println!(
            "  {:>10} {:>12.2} {:>14.2} {:>10.2}",
            row.matched_frequency, row.intensity, row.noise_floor_value, row.snr
        );
    }
    for warning in analysis.warnings() {
        println!("  warning: {warning}");
    }
}

fn channel_json(channel: &Channel, analysis: &ChannelAnalysis) -> serde_json::Value {
    // NaN has no JSON form; unmatched rows serialize as null
    let finite = |v: f64| v.is_finite().then_some(v);
    let rows: Vec<_> = analysis
        .report
        .results
        .iter()
        .zip(&analysis.peaks.peaks)
        .map(|(row, peak)| {
            serde_json::json!({
                "peak_frequency": peak.frequency,
                "matched_frequency": row.matched_frequency,
                "intensity": finite(row.intensity),
                "noise_floor": finite(row.noise_floor_value),
                "snr": finite(row.snr),
            })
        })
        .collect();
    serde_json::json!({
        "channel": channel.suffix.trim_start_matches('_'),
        "fit_coefficients": analysis.fit().map(|c| c.coefficients()),
        "warnings": analysis.warnings().map(ToString::to_string).collect::<Vec<_>>(),
        "results": rows,
    })
}
