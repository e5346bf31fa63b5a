//! # Configuration Loading
//!
//! YAML loading for [`FilterConfig`](super::FilterConfig) with explicit
//! validation. Hosts that embed the filter usually hand the configuration
//! block over directly; the file loader exists for standalone pipelines and
//! tooling.

use std::path::Path;

use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::FilterConfig;

const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1MB limit

/// Load and validate configuration from a YAML file
pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<FilterConfig> {
    let path = path.as_ref();
    let contents = read_config_file_safely(path)?;
    parse_config(&contents, &path.display().to_string())
}

/// Load and validate configuration from a YAML string
pub fn load_from_str(contents: &str) -> ConfigResult<FilterConfig> {
    parse_config(contents, "<inline>")
}

fn parse_config(contents: &str, source: &str) -> ConfigResult<FilterConfig> {
    let config: FilterConfig = serde_yaml::from_str(contents)
        .map_err(|e| ConfigurationError::invalid_yaml(source, e))?;
    config.validate()?;
    debug!(
        source = %source,
        hosts = ?config.hosts,
        get_mappings = config.get.len(),
        set_mappings = config.set.len(),
        "Filter configuration loaded"
    );
    Ok(config)
}

/// Safely read a configuration file with a size limit
fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigurationError::invalid_value(
            "file_size",
            metadata.len().to_string(),
            format!(
                "Configuration file too large ({} bytes > {} byte limit)",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        ));
    }

    if !metadata.is_file() {
        return Err(ConfigurationError::invalid_value(
            "file_type",
            "directory or special file",
            "Configuration path must point to a regular file",
        ));
    }

    std::fs::read_to_string(path)
        .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
}
