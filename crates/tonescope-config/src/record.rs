//! Parameter records written next to analysis outputs.
//!
//! A record captures the command, tool version, input files and the
//! effective [`AnalysisConfig`] of a run, so any result table can be traced
//! back to the settings that produced it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tonescope_analysis::write_atomic;

use crate::config::AnalysisConfig;
use crate::error::ConfigError;

/// Suffix appended to the output stem for record files.
pub const RECORD_SUFFIX: &str = "_params.toml";

/// Settings and inputs of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterRecord {
    /// Subcommand that ran, e.g. `peaks`.
    pub command: String,
    /// Version of the tool that wrote the record.
    pub version: String,
    /// Named input and output files, e.g. `input`, `toneset`, `noise_floor`.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Effective analysis settings.
    pub analysis: AnalysisConfig,
}

impl ParameterRecord {
    /// Create a record for `command` with the crate version.
    pub fn new(command: impl Into<String>, analysis: AnalysisConfig) -> Self {
        Self {
            command: command.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            files: BTreeMap::new(),
            analysis,
        }
    }

    /// Record a named file path.
    pub fn with_file(mut self, role: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.files
            .insert(role.into(), path.as_ref().display().to_string());
        self
    }

    /// Record path for an output stem: `<stem>_params.toml`.
    pub fn path_for(stem: impl AsRef<Path>) -> PathBuf {
        let mut name = stem.as_ref().as_os_str().to_owned();
        name.push(RECORD_SUFFIX);
        PathBuf::from(name)
    }

    /// Load a record from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Save the record to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_toml(path.as_ref(), &self.to_toml()?)
    }

    /// Convert the record to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Write `content` to `path` atomically, creating its directory first.
pub(crate) fn write_toml(path: &Path, content: &str) -> Result<(), ConfigError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }

    write_atomic(path, content.as_bytes()).map_err(|e| ConfigError::write_file(path, e))?;
    tracing::info!(path = %path.display(), "wrote parameters");
    Ok(())
}
