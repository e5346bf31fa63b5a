//! # Configuration Error Types
//!
//! Structured errors for configuration loading and validation. Configuration
//! problems are fatal at startup: they abort filter registration instead of
//! being retried at runtime.

use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration value for {field}: {value}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {reason}")]
    InvalidYaml { path: String, reason: String },
}

impl ConfigurationError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a file read error
    pub fn file_read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid YAML error
    pub fn invalid_yaml(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::InvalidYaml {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;
