//! # Filter Configuration
//!
//! Configuration surface for the memcached filter core. The host pipeline
//! hands over one configuration block at registration time; it is validated
//! once and immutable afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use memcached_filter_core::config::FilterConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config: FilterConfig = memcached_filter_core::config::load_from_str(
//!     r#"
//!     hosts: ["cache-1:11211"]
//!     namespace: "sessions"
//!     get:
//!       "user:%{user_id}": "[user][profile]"
//!     "#,
//! )?;
//! assert_eq!(config.hosts, vec!["cache-1:11211".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::remote::ConnectionOptions;
use crate::utils::serde::deserialize_ordered_mappings;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{load_from_file, load_from_str};

fn default_hosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_tag_on_failure() -> String {
    "_memcached_failure".to_string()
}

fn default_local_cache_max_entries() -> usize {
    1024
}

/// Root configuration for one filter instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Remote cache endpoints, `host` or `host:port` form
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Key prefix the client applies to every cache key
    #[serde(default)]
    pub namespace: Option<String>,

    /// Ordered key-template to destination-field mappings for lookups
    #[serde(default, deserialize_with = "deserialize_ordered_mappings")]
    pub get: Vec<(String, String)>,

    /// Ordered source-field to key-template mappings for stores
    #[serde(default, deserialize_with = "deserialize_ordered_mappings")]
    pub set: Vec<(String, String)>,

    /// Server-side expiry in seconds for stored values (0 = never expire)
    #[serde(default)]
    pub ttl: i64,

    /// Tag appended to a record when cache processing fails
    #[serde(default = "default_tag_on_failure")]
    pub tag_on_failure: String,

    /// Per-worker local cache settings
    #[serde(default)]
    pub local_cache: LocalCacheConfig,
}

/// Settings for the per-worker local cache fronting the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheConfig {
    /// Entry lifetime in seconds (0 disables the local cache)
    #[serde(default)]
    pub ttl_seconds: f64,

    /// Capacity bound in entries (0 disables the local cache)
    #[serde(default = "default_local_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            namespace: None,
            get: Vec::new(),
            set: Vec::new(),
            ttl: 0,
            tag_on_failure: default_tag_on_failure(),
            local_cache: LocalCacheConfig::default(),
        }
    }
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 0.0,
            max_entries: default_local_cache_max_entries(),
        }
    }
}

impl LocalCacheConfig {
    /// Whether the local cache participates at all.
    ///
    /// A zero TTL or a zero capacity turns the cache into a pass-through.
    pub fn is_enabled(&self) -> bool {
        self.ttl_seconds > 0.0 && self.max_entries > 0
    }

    /// Get entry lifetime as Duration. Only meaningful when enabled.
    ///
    /// Lifetimes too large for `Duration` saturate to `Duration::MAX`,
    /// which never expires.
    pub fn ttl_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.ttl_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl FilterConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.hosts.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "hosts",
                "[]",
                "at least one cache host must be configured",
            ));
        }

        for host in &self.hosts {
            if host.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "hosts",
                    host.clone(),
                    "host entries must not be blank",
                ));
            }
        }

        if self.ttl < 0 {
            return Err(ConfigurationError::invalid_value(
                "ttl",
                self.ttl.to_string(),
                "ttl must be non-negative",
            ));
        }

        if self.tag_on_failure.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "tag_on_failure",
                self.tag_on_failure.clone(),
                "failure tag must not be blank",
            ));
        }

        if !self.local_cache.ttl_seconds.is_finite() || self.local_cache.ttl_seconds < 0.0 {
            return Err(ConfigurationError::invalid_value(
                "local_cache.ttl_seconds",
                self.local_cache.ttl_seconds.to_string(),
                "local cache ttl must be a non-negative number",
            ));
        }

        Ok(())
    }

    /// Client connection options derived from this configuration.
    ///
    /// A blank namespace is normalized to "no namespace".
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            ttl_seconds: self.ttl.max(0) as u64,
            namespace: self
                .namespace
                .as_deref()
                .map(str::trim)
                .filter(|namespace| !namespace.is_empty())
                .map(String::from),
        }
    }

    /// Check whether any lookup mappings are configured
    pub fn has_get_mappings(&self) -> bool {
        !self.get.is_empty()
    }

    /// Check whether any store mappings are configured
    pub fn has_set_mappings(&self) -> bool {
        !self.set.is_empty()
    }
}
