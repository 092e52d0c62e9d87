//! Analysis configuration validation.
//!
//! [`AnalysisConfig::validate`](crate::AnalysisConfig::validate) collects
//! every problem instead of stopping at the first one, so a bad config file
//! can be fixed in a single pass.

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A name field holds a value the tools do not know.
    #[error("unknown value '{value}' for {field}")]
    UnknownName {
        /// Dotted field path, e.g. `spectrum.window`.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// A numeric field is outside its allowed range.
    #[error("{field} = {value} is out of range: {reason}")]
    OutOfRange {
        /// Dotted field path.
        field: String,
        /// The value that was out of range.
        value: f64,
        /// Allowed range.
        reason: String,
    },

    /// Two settings contradict each other.
    #[error("inconsistent settings: {0}")]
    Inconsistent(String),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Create an unknown-name error.
    pub fn unknown(field: &str, value: &str) -> Self {
        ValidationError::UnknownName {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(field: &str, value: f64, reason: impl Into<String>) -> Self {
        ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors: none is `Ok`, one is itself, more are [`ValidationError::Multiple`].
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    /// Number of individual problems.
    pub fn count(&self) -> usize {
        match self {
            ValidationError::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_empty_is_ok() {
        assert!(ValidationError::collect(Vec::new()).is_ok());
    }

    #[test]
    fn collect_single_is_unwrapped() {
        let err = ValidationError::collect(vec![ValidationError::unknown("snr.unit_mode", "x")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownName { .. }));
        assert_eq!(err.count(), 1);
    }

    #[test]
    fn multiple_display_joins_messages() {
        let err = ValidationError::collect(vec![
            ValidationError::unknown("spectrum.kind", "energy"),
            ValidationError::out_of_range("spectrum.overlap", 120.0, "must be in [0, 100)"),
        ])
        .unwrap_err();
        assert_eq!(err.count(), 2);
        let msg = err.to_string();
        assert!(msg.contains("unknown value 'energy' for spectrum.kind"), "got: {msg}");
        assert!(msg.contains("spectrum.overlap = 120 is out of range"), "got: {msg}");
    }
}
