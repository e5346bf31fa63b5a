//! # Cache Layers
//!
//! Two tiers: the per-worker [`LocalCache`] short-circuit and the shared
//! [`RemoteCache`] client seam guarded by the connection manager.

pub mod local;
pub mod memory;
pub mod remote;

pub use local::{LocalCache, LocalCacheStats};
pub use memory::{InMemoryConnector, InMemoryRemoteCache};
pub use remote::{CacheError, CacheResult, ConnectionOptions, RemoteCache, RemoteCacheConnector};
