//! # Remote Cache Interface
//!
//! Trait boundary between the filter core and the memcached client. The real
//! client lives on the other side of this seam; the crate ships an in-memory
//! implementation for development pipelines and tests.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Cache communication error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache network error: {message}")]
    Network { message: String },

    #[error("Cache ring error: {message}")]
    Ring { message: String },

    #[error("Cache value error: {message}")]
    Value { message: String },

    #[error("Internal cache error: {message}")]
    Internal { message: String },
}

impl CacheError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a ring error
    pub fn ring(message: impl Into<String>) -> Self {
        Self::Ring {
            message: message.into(),
        }
    }

    /// Create a value error
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error indicates a broken connection.
    ///
    /// Connection-class errors mark the connection down and force a reconnect
    /// on the next record; every other error leaves the connection alone.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Ring { .. })
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Options applied when a client connection is built
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// Server-side expiry in seconds for stored values (0 = no expiry)
    pub ttl_seconds: u64,
    /// Key prefix applied to every cache key
    pub namespace: Option<String>,
}

/// A live client handle to the remote cache.
///
/// Implementations are shared across workers behind an `Arc` and must be safe
/// to call concurrently. All calls block the calling worker.
pub trait RemoteCache: Send + Sync {
    /// Verify the connection is usable. Called once right after connecting.
    fn alive(&self) -> CacheResult<()>;

    /// Fetch all given keys in one round trip.
    ///
    /// The result contains only keys that resolved to a value; absent keys are
    /// simply not present in the map.
    fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, Value>>;

    /// Store a single value under a key, overwriting any previous value.
    fn set(&self, key: &str, value: &Value) -> CacheResult<()>;

    /// Run a block of operations as one batch.
    ///
    /// `set` calls issued inside the block are grouped into a single network
    /// exchange where the backend supports it.
    fn multi(
        &self,
        block: &mut dyn FnMut(&dyn RemoteCache) -> CacheResult<()>,
    ) -> CacheResult<()>;

    /// Release the connection. Best effort: never fails.
    fn close(&self);
}

/// Factory for [`RemoteCache`] handles.
///
/// The connection manager calls this at startup and on every reconnect
/// attempt, so implementations must be reusable.
pub trait RemoteCacheConnector: Send + Sync {
    /// Build a new client handle for the given hosts.
    fn connect(
        &self,
        hosts: &[String],
        options: &ConnectionOptions,
    ) -> CacheResult<Arc<dyn RemoteCache>>;
}
