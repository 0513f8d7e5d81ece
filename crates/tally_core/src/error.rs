//! Tally error types

use thiserror::Error;

/// Errors raised by host-supplied configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    /// A printf-style format string could not be parsed
    #[error("Invalid format string {format:?}: {reason}")]
    InvalidFormat { format: String, reason: String },

    /// A color literal could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// A formatted value could not be rendered (e.g. NaN into an integer directive)
    #[error("Cannot render value {value}: {reason}")]
    Unrenderable { value: f64, reason: String },

    /// Generic configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TallyError {
    pub(crate) fn invalid_format(format: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for tally operations
pub type Result<T> = std::result::Result<T, TallyError>;
