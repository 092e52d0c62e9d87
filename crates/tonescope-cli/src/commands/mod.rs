//! CLI command implementations.

pub mod common;
pub mod noise_floor;
pub mod peaks;
