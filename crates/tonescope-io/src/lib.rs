//! WAV input for the tonescope analysis tools.
//!
//! This crate provides:
//!
//! - **Loading**: [`read_wav`] mixes every channel down to mono,
//!   [`read_wav_channels`] keeps each channel separate
//! - **Scaling**: [`SampleScale`] picks normalized `[-1, 1)` samples or raw
//!   integer PCM values
//! - **Trimming**: [`trim_edges`] cuts a fixed duration off both ends
//! - **Writing**: [`write_wav`] and [`write_wav_channels`] for test fixtures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tonescope_io::{SampleScale, read_wav_channels, trim_edges};
//!
//! let (channels, spec) = read_wav_channels("recording.wav", SampleScale::Normalized)?;
//! let left = trim_edges(&channels[0], spec.sample_rate, 1.0);
//! ```

mod wav;

pub use wav::{
    SampleScale, WavSpec, read_wav, read_wav_channels, trim_edges, write_wav, write_wav_channels,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The file holds no audio channels.
    #[error("WAV file has no channels")]
    NoChannels,

    /// Channels passed for writing differ in length.
    #[error("channel lengths differ: {0:?}")]
    ChannelLengthMismatch(Vec<usize>),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
