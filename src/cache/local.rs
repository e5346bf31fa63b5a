//! # Per-Worker Local Cache
//!
//! Bounded LRU cache with lazy TTL expiry, fronting the remote store for one
//! worker. Instances are never shared across workers, so there is no locking
//! here at all; contention is traded for redundant population across workers.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::trace;

use crate::config::LocalCacheConfig;

/// Counters describing one local cache's traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl LocalCacheStats {
    /// Hit rate over all lookups, 0.0 when the cache saw no traffic
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Value,
    inserted_at: Instant,
}

impl LocalEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Bounded, TTL-aware cache owned by a single worker.
///
/// Only values that actually resolved remotely are ever stored; a miss is
/// never cached, so missing keys re-query the remote store on every record.
/// Expiration is checked lazily on read, there is no background sweep.
#[derive(Debug)]
pub struct LocalCache {
    entries: HashMap<String, LocalEntry>,
    access_order: VecDeque<String>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
    stats: LocalCacheStats,
}

impl LocalCache {
    /// Build a cache from worker settings.
    ///
    /// A zero TTL or zero capacity produces a disabled cache: every `get`
    /// reports absence and every `put` is a no-op.
    pub fn new(config: &LocalCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: VecDeque::new(),
            ttl: config.ttl_duration(),
            max_entries: config.max_entries,
            enabled: config.is_enabled(),
            stats: LocalCacheStats::default(),
        }
    }

    /// Look up a key, refreshing its recency on a hit.
    ///
    /// An entry whose age reached the TTL is removed on the spot and reported
    /// as absent.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(self.ttl) {
                self.entries.remove(key);
                self.remove_from_order(key);
                self.stats.expirations += 1;
                self.stats.misses += 1;
                trace!(key = %key, "Local cache entry expired");
                return None;
            }
            let value = entry.value.clone();
            self.touch(key);
            self.stats.hits += 1;
            return Some(value);
        }
        self.stats.misses += 1;
        None
    }

    /// Insert or overwrite a key, evicting the least-recently-used entry
    /// when a new key would exceed capacity.
    pub fn put(&mut self, key: &str, value: Value) {
        if !self.enabled {
            return;
        }
        let entry = LocalEntry {
            value,
            inserted_at: Instant::now(),
        };
        if self.entries.insert(key.to_string(), entry).is_some() {
            self.touch(key);
            return;
        }
        if self.entries.len() > self.max_entries {
            self.evict_lru();
        }
        self.access_order.push_back(key.to_string());
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshot of the traffic counters
    pub fn stats(&self) -> LocalCacheStats {
        self.stats
    }

    fn touch(&mut self, key: &str) {
        self.remove_from_order(key);
        self.access_order.push_back(key.to_string());
    }

    fn remove_from_order(&mut self, key: &str) {
        self.access_order.retain(|ordered| ordered != key);
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.access_order.pop_front() {
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            trace!(key = %oldest, "Local cache evicted least recently used entry");
        }
    }
}
