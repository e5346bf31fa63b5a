//! # Filter Error Types
//!
//! Top-level error surface for the crate. Only construction and explicit
//! loading paths return these; per-record processing folds every failure into
//! the record's failure tag and the process outcome instead of raising.

use thiserror::Error;

use crate::cache::remote::CacheError;
use crate::config::error::ConfigurationError;

/// Errors surfaced while constructing the filter
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Cache connection error: {0}")]
    Connection(#[from] CacheError),
}

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
