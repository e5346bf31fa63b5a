//! Shared test doubles for the integration suites.
//!
//! Everything here composes over the crate's in-memory backend so the suites
//! can observe call counts, inject failures, and inspect stored state without
//! a real memcached cluster.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use memcached_filter_core::cache::{
    CacheError, CacheResult, ConnectionOptions, InMemoryConnector, RemoteCache,
    RemoteCacheConnector,
};
use memcached_filter_core::config::FilterConfig;
use memcached_filter_core::record::JsonRecord;

/// Which error class an injected failure should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Ring,
    Value,
}

impl FailureKind {
    pub fn to_error(self) -> CacheError {
        match self {
            FailureKind::Network => CacheError::network("injected network failure"),
            FailureKind::Ring => CacheError::ring("injected ring failure"),
            FailureKind::Value => CacheError::value("injected value failure"),
        }
    }
}

/// Remote cache wrapper that counts calls and injects scripted failures.
pub struct CountingRemoteCache {
    inner: Arc<dyn RemoteCache>,
    alive_calls: AtomicUsize,
    get_multi_calls: AtomicUsize,
    set_calls: AtomicUsize,
    multi_calls: AtomicUsize,
    close_calls: AtomicUsize,
    fail_next_get_multi: Mutex<Option<FailureKind>>,
    fail_next_set: Mutex<Option<FailureKind>>,
}

impl CountingRemoteCache {
    pub fn new(inner: Arc<dyn RemoteCache>) -> Self {
        Self {
            inner,
            alive_calls: AtomicUsize::new(0),
            get_multi_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            multi_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            fail_next_get_multi: Mutex::new(None),
            fail_next_set: Mutex::new(None),
        }
    }

    /// Arranges for the next `get_multi` call to fail with the given kind.
    pub fn fail_next_get_multi(&self, kind: FailureKind) {
        *self.fail_next_get_multi.lock() = Some(kind);
    }

    /// Arranges for the next `set` call to fail with the given kind.
    pub fn fail_next_set(&self, kind: FailureKind) {
        *self.fail_next_set.lock() = Some(kind);
    }

    pub fn alive_count(&self) -> usize {
        self.alive_calls.load(Ordering::SeqCst)
    }

    pub fn get_multi_count(&self) -> usize {
        self.get_multi_calls.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn multi_count(&self) -> usize {
        self.multi_calls.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl RemoteCache for CountingRemoteCache {
    fn alive(&self) -> CacheResult<()> {
        self.alive_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.alive()
    }

    fn get_multi(&self, keys: &[String]) -> CacheResult<std::collections::HashMap<String, Value>> {
        self.get_multi_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.fail_next_get_multi.lock().take() {
            return Err(kind.to_error());
        }
        self.inner.get_multi(keys)
    }

    fn set(&self, key: &str, value: &Value) -> CacheResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.fail_next_set.lock().take() {
            return Err(kind.to_error());
        }
        self.inner.set(key, value)
    }

    fn multi(
        &self,
        block: &mut dyn FnMut(&dyn RemoteCache) -> CacheResult<()>,
    ) -> CacheResult<()> {
        self.multi_calls.fetch_add(1, Ordering::SeqCst);
        // Run the block against the counting wrapper so batched writes are
        // observed (and can be failed) like direct ones.
        block(self)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

/// Connector over a shared in-memory store that records every connection
/// attempt and keeps the counting handles it has given out.
pub struct TestConnector {
    memory: InMemoryConnector,
    connects: AtomicUsize,
    fail_connects_remaining: AtomicUsize,
    handles: Mutex<Vec<Arc<CountingRemoteCache>>>,
}

impl TestConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            memory: InMemoryConnector::new(),
            connects: AtomicUsize::new(0),
            fail_connects_remaining: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Boxes a shared reference for handing to `MemcachedFilter::new` while
    /// the test keeps its own handle for assertions.
    pub fn boxed(connector: &Arc<Self>) -> Box<dyn RemoteCacheConnector> {
        Box::new(SharedConnector(Arc::clone(connector)))
    }

    /// Makes the next `n` connection attempts fail with a network error.
    pub fn fail_next_connects(&self, n: usize) {
        self.fail_connects_remaining.store(n, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The most recently issued handle. Panics when no connection succeeded.
    pub fn latest_handle(&self) -> Arc<CountingRemoteCache> {
        self.handles
            .lock()
            .last()
            .map(Arc::clone)
            .expect("no remote cache handle has been issued")
    }

    /// Total `get_multi` calls across every handle ever issued.
    pub fn total_get_multi_count(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .map(|handle| handle.get_multi_count())
            .sum()
    }

    /// Total `set` calls across every handle ever issued.
    pub fn total_set_count(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .map(|handle| handle.set_count())
            .sum()
    }

    /// Seeds the shared store through a side handle, honoring the namespace
    /// carried by `options`.
    pub fn seed(&self, options: &ConnectionOptions, key: &str, value: &Value) {
        self.memory
            .open(options)
            .set(key, value)
            .expect("in-memory set cannot fail");
    }

    /// Reads a raw (already namespaced) key from the shared store.
    pub fn stored(&self, namespaced_key: &str) -> Option<Value> {
        self.memory
            .open(&ConnectionOptions::default())
            .stored_value(namespaced_key)
    }

    fn connect_impl(
        &self,
        hosts: &[String],
        options: &ConnectionOptions,
    ) -> CacheResult<Arc<dyn RemoteCache>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_connects_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_connects_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(CacheError::network("connection refused"));
        }
        let inner = self.memory.connect(hosts, options)?;
        let handle = Arc::new(CountingRemoteCache::new(inner));
        self.handles.lock().push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// Cloneable adapter so a single `TestConnector` can outlive the boxed
/// connector owned by the filter.
pub struct SharedConnector(pub Arc<TestConnector>);

impl RemoteCacheConnector for SharedConnector {
    fn connect(
        &self,
        hosts: &[String],
        options: &ConnectionOptions,
    ) -> CacheResult<Arc<dyn RemoteCache>> {
        self.0.connect_impl(hosts, options)
    }
}

/// Parses a YAML fragment into a validated filter configuration.
pub fn filter_config(yaml: &str) -> FilterConfig {
    memcached_filter_core::config::load_from_str(yaml).expect("test configuration must be valid")
}

/// Builds a record from a JSON object literal.
pub fn record_with(fields: Value) -> JsonRecord {
    match fields {
        Value::Object(map) => JsonRecord::from_object(map),
        other => panic!("record_with expects a JSON object, got {other}"),
    }
}

/// The record's tags as plain strings, empty when no tags were added.
pub fn tags_of(record: &JsonRecord) -> Vec<String> {
    match record.fields().get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        Some(Value::String(tag)) => vec![tag.clone()],
        _ => Vec::new(),
    }
}
