//! Tonescope CLI - tone peak, noise-floor and SNR analysis of recordings.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tonescope")]
#[command(author, version, about = "Tone peak and noise-floor SNR analysis", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find tone peaks and measure their SNR against the noise floor
    Peaks(commands::peaks::PeaksArgs),

    /// Build a per-tone noise-floor table from a background recording
    NoiseFloor(commands::noise_floor::NoiseFloorArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Peaks(args) => commands::peaks::run(args),
        Commands::NoiseFloor(args) => commands::noise_floor::run(args),
    }
}
