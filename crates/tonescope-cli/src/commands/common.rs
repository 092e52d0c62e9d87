//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use tonescope_analysis::ToneSet;
use tonescope_config::AnalysisConfig;
use tonescope_io::{SampleScale, WavSpec, read_wav, read_wav_channels, trim_edges};

/// Spectrum and search options shared by every command.
///
/// Each flag overrides the matching config-file value.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Analysis config file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Toneset file, one frequency in Hz per line
    #[arg(short, long, value_name = "FILE")]
    pub toneset: Option<PathBuf>,

    /// FFT size
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Segment overlap in percent
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Segment window (rectangular, hann, hamming, blackman, blackman-harris)
    #[arg(long)]
    pub window: Option<String>,

    /// Half width of the search window around each tone in Hz
    #[arg(short = 'r', long)]
    pub search_range: Option<f64>,

    /// Moving-average window in bins
    #[arg(long)]
    pub moving_average: Option<isize>,

    /// Seconds trimmed from both ends of the recording
    #[arg(long, default_value = "0")]
    pub cut: f64,

    /// Keep integer PCM values instead of normalizing to [-1, 1)
    #[arg(long)]
    pub raw: bool,

    /// Directory for output files (defaults to the input's directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the config file, or defaults, and apply flag overrides.
    pub fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(v) = self.fft_size {
            config.spectrum.fft_size = v;
        }
        if let Some(v) = self.overlap {
            config.spectrum.overlap = v;
        }
        if let Some(v) = &self.window {
            config.spectrum.window.clone_from(v);
        }
        if let Some(v) = self.search_range {
            config.search.search_range = v;
        }
        if let Some(v) = self.moving_average {
            config.noise_floor.moving_average = v;
        }
        Ok(config)
    }

    /// Load the toneset file, or the built-in set.
    pub fn load_toneset(&self) -> anyhow::Result<ToneSet> {
        let Some(path) = &self.toneset else {
            return Ok(ToneSet::default());
        };
        let parsed = ToneSet::load(path)
            .with_context(|| format!("loading toneset {}", path.display()))?;
        if parsed.value.is_empty() {
            anyhow::bail!("toneset {} holds no tones", path.display());
        }
        Ok(parsed.value)
    }

    /// Sample scale selected by `--raw`.
    pub fn sample_scale(&self) -> SampleScale {
        if self.raw {
            SampleScale::Raw
        } else {
            SampleScale::Normalized
        }
    }

    /// Output stem for `input`: its path without extension, moved into
    /// `--output-dir` when given.
    pub fn output_stem(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        match &self.output_dir {
            Some(dir) => dir.join(stem),
            None => input.with_file_name(stem),
        }
    }
}

/// One channel ready for analysis.
#[derive(Debug, Clone)]
pub struct Channel {
    /// File-name suffix: empty for mono, `_left`/`_right` for stereo.
    pub suffix: String,
    /// Samples after trimming.
    pub samples: Vec<f32>,
}

/// Suffix for channel `index` of `count`.
pub fn channel_suffix(index: usize, count: usize) -> String {
    match (count, index) {
        (1, _) => String::new(),
        (2, 0) => "_left".to_string(),
        (2, _) => "_right".to_string(),
        _ => format!("_ch{}", index + 1),
    }
}

/// Read `input` as one mixed-down channel, or one entry per file channel
/// with `split`.
pub fn load_channels(
    input: &Path,
    split: bool,
    args: &CommonArgs,
) -> anyhow::Result<(Vec<Channel>, WavSpec)> {
    let scale = args.sample_scale();
    let (buffers, spec) = if split {
        read_wav_channels(input, scale)
    } else {
        read_wav(input, scale).map(|(mono, spec)| (vec![mono], spec))
    }
    .with_context(|| format!("reading {}", input.display()))?;

    let count = buffers.len();
    let channels = buffers
        .into_iter()
        .enumerate()
        .map(|(i, samples)| Channel {
            suffix: channel_suffix(i, count),
            samples: trim_edges(&samples, spec.sample_rate, args.cut).to_vec(),
        })
        .collect();

    tracing::info!(
        path = %input.display(),
        channels = count,
        sample_rate = spec.sample_rate,
        "loaded recording"
    );
    Ok((channels, spec))
}

/// `stem` with `suffix` appended to its file name.
pub fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_follow_channel_count() {
        assert_eq!(channel_suffix(0, 1), "");
        assert_eq!(channel_suffix(0, 2), "_left");
        assert_eq!(channel_suffix(1, 2), "_right");
        assert_eq!(channel_suffix(2, 4), "_ch3");
    }

    #[test]
    fn output_stem_respects_output_dir() {
        let args = CommonArgs::default();
        assert_eq!(
            args.output_stem(Path::new("data/rec.WAV")),
            PathBuf::from("data/rec")
        );

        let args = CommonArgs {
            output_dir: Some(PathBuf::from("out")),
            ..CommonArgs::default()
        };
        assert_eq!(args.output_stem(Path::new("data/rec.wav")), PathBuf::from("out/rec"));
    }

    #[test]
    fn flags_override_config() {
        let args = CommonArgs {
            fft_size: Some(8192),
            window: Some("hann".to_string()),
            ..CommonArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.spectrum.fft_size, 8192);
        assert_eq!(config.spectrum.window, "hann");
        assert_eq!(config.search.search_range, 50.0);
    }

    #[test]
    fn with_suffix_appends_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("out/rec"), "_left.txt"),
            PathBuf::from("out/rec_left.txt")
        );
    }
}
