//! # In-Memory Remote Cache
//!
//! Reference backend implementing [`RemoteCache`] against a process-local
//! store. Development pipelines and tests use it in place of a real client;
//! it honors the same namespace and expiry semantics a server would.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use super::remote::{CacheResult, ConnectionOptions, RemoteCache, RemoteCacheConnector};

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

type SharedStore = Arc<Mutex<HashMap<String, StoredEntry>>>;

/// Process-local [`RemoteCache`] implementation
pub struct InMemoryRemoteCache {
    store: SharedStore,
    namespace: Option<String>,
    ttl: Option<Duration>,
}

impl InMemoryRemoteCache {
    /// Create a standalone cache with its own private store
    pub fn new(options: &ConnectionOptions) -> Self {
        Self::with_store(Arc::new(Mutex::new(HashMap::new())), options)
    }

    fn with_store(store: SharedStore, options: &ConnectionOptions) -> Self {
        Self {
            store,
            namespace: options.namespace.clone(),
            ttl: (options.ttl_seconds > 0).then(|| Duration::from_secs(options.ttl_seconds)),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}:{key}"),
            None => key.to_string(),
        }
    }

    /// Number of live entries in the backing store
    pub fn len(&self) -> usize {
        let mut store = self.store.lock();
        store.retain(|_, entry| !entry.is_expired());
        store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a stored value by its full, already-namespaced key
    pub fn stored_value(&self, namespaced_key: &str) -> Option<Value> {
        self.store
            .lock()
            .get(namespaced_key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }
}

impl RemoteCache for InMemoryRemoteCache {
    fn alive(&self) -> CacheResult<()> {
        Ok(())
    }

    fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, Value>> {
        let store = self.store.lock();
        let mut results = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = store.get(&self.namespaced(key)) {
                if !entry.is_expired() && !entry.value.is_null() {
                    results.insert(key.clone(), entry.value.clone());
                }
            }
        }
        Ok(results)
    }

    fn set(&self, key: &str, value: &Value) -> CacheResult<()> {
        let entry = StoredEntry {
            value: value.clone(),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        self.store.lock().insert(self.namespaced(key), entry);
        Ok(())
    }

    fn multi(
        &self,
        block: &mut dyn FnMut(&dyn RemoteCache) -> CacheResult<()>,
    ) -> CacheResult<()> {
        // batching is a wire concern; locally the block runs inline
        block(self)
    }

    fn close(&self) {}
}

/// Connector handing out handles bound to one shared store.
///
/// Reconnecting yields a fresh handle over the same data, modelling a server
/// that outlives client connections.
#[derive(Default)]
pub struct InMemoryConnector {
    store: SharedStore,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct handle to the shared store for seeding and inspection
    pub fn open(&self, options: &ConnectionOptions) -> InMemoryRemoteCache {
        InMemoryRemoteCache::with_store(Arc::clone(&self.store), options)
    }
}

impl RemoteCacheConnector for InMemoryConnector {
    fn connect(
        &self,
        _hosts: &[String],
        options: &ConnectionOptions,
    ) -> CacheResult<Arc<dyn RemoteCache>> {
        Ok(Arc::new(self.open(options)))
    }
}
