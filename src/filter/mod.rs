//! # Memcached Filter
//!
//! Per-record orchestration: expands key templates, consults the worker's
//! local cache, batches the remaining lookups into one remote round trip,
//! writes resolved values back into the record, and classifies failures.
//!
//! One [`MemcachedFilter`] is shared by all workers; each worker owns a
//! [`WorkerContext`] and passes it into every [`MemcachedFilter::process`]
//! call. No error ever escapes `process`: degraded records are signalled
//! through the failure tag and the returned [`ProcessOutcome`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::cache::local::LocalCache;
use crate::cache::remote::{CacheError, CacheResult, RemoteCache, RemoteCacheConnector};
use crate::config::{FilterConfig, LocalCacheConfig};
use crate::connection::ConnectionManager;
use crate::error::FilterError;
use crate::mapping::{compile_get_mappings, compile_set_mappings, KeyMapping};
use crate::record::Record;

/// Outcome of one record's pass through the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// At least one lookup resolved or one store was written
    Matched,
    /// Processing ran cleanly but no mapping took effect
    Unmatched,
    /// Processing failed; the record carries the failure tag
    Failed,
}

impl ProcessOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Per-worker processing state.
///
/// Contexts are never shared: the local cache inside needs no locking, and
/// its contents are private to the owning worker.
pub struct WorkerContext {
    worker_id: Uuid,
    local_cache: LocalCache,
}

impl WorkerContext {
    fn new(settings: &LocalCacheConfig) -> Self {
        let worker_id = Uuid::new_v4();
        debug!(
            worker_id = %worker_id,
            local_cache_enabled = settings.is_enabled(),
            "Worker context created"
        );
        Self {
            worker_id,
            local_cache: LocalCache::new(settings),
        }
    }

    /// Identity of this worker in log output
    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    /// The worker's private cache, exposed for stats inspection
    pub fn local_cache(&self) -> &LocalCache {
        &self.local_cache
    }
}

/// The filter core: one instance shared by all workers
pub struct MemcachedFilter {
    config: FilterConfig,
    get_mappings: Vec<KeyMapping>,
    set_mappings: Vec<KeyMapping>,
    connection: ConnectionManager,
}

impl MemcachedFilter {
    /// Validate configuration, compile the mapping tables, and establish the
    /// initial connection.
    ///
    /// Both an invalid configuration and an unreachable cache are fatal here;
    /// once constructed, the filter degrades records instead of failing.
    pub fn new(
        config: FilterConfig,
        connector: Box<dyn RemoteCacheConnector>,
    ) -> Result<Self, FilterError> {
        config.validate()?;
        let get_mappings = compile_get_mappings(&config.get);
        let set_mappings = compile_set_mappings(&config.set);
        let connection = ConnectionManager::establish(
            config.hosts.clone(),
            config.connection_options(),
            connector,
        )?;
        info!(
            hosts = ?config.hosts,
            namespace = config.namespace.as_deref(),
            get_mappings = get_mappings.len(),
            set_mappings = set_mappings.len(),
            local_cache_enabled = config.local_cache.is_enabled(),
            "Memcached filter registered"
        );
        Ok(Self {
            config,
            get_mappings,
            set_mappings,
            connection,
        })
    }

    /// Create processing state for one worker
    pub fn worker_context(&self) -> WorkerContext {
        WorkerContext::new(&self.config.local_cache)
    }

    /// The active configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Tag applied to records that fail cache processing
    pub fn tag_on_failure(&self) -> &str {
        &self.config.tag_on_failure
    }

    /// Connection state, exposed for host-side health reporting
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Process one record.
    ///
    /// When the connection is known-down and cannot be re-established, the
    /// record is tagged and no cache traffic happens at all. A
    /// connection-class error mid-flight tags the record, marks the
    /// connection down and releases the stale handle immediately; any other
    /// error is logged and tagged without touching the connection.
    pub fn process(&self, record: &mut dyn Record, context: &mut WorkerContext) -> ProcessOutcome {
        if !self.connection.ensure_available() {
            record.tag(&self.config.tag_on_failure);
            return ProcessOutcome::Failed;
        }
        match self.run(record, context) {
            Ok(true) => ProcessOutcome::Matched,
            Ok(false) => ProcessOutcome::Unmatched,
            Err(error) if error.is_connection_error() => {
                error!(
                    error = %error,
                    hosts = ?self.config.hosts,
                    namespace = self.config.namespace.as_deref(),
                    worker_id = %context.worker_id,
                    "Remote cache communication failed"
                );
                record.tag(&self.config.tag_on_failure);
                self.connection.mark_down();
                self.connection.close();
                ProcessOutcome::Failed
            }
            Err(error) => {
                error!(
                    error = %error,
                    worker_id = %context.worker_id,
                    "Unexpected error while processing record"
                );
                record.tag(&self.config.tag_on_failure);
                ProcessOutcome::Failed
            }
        }
    }

    /// Shut down: release the remote connection. Never fails.
    pub fn close(&self) {
        self.connection.close();
        info!(hosts = ?self.config.hosts, "Memcached filter closed");
    }

    fn run(&self, record: &mut dyn Record, context: &mut WorkerContext) -> CacheResult<bool> {
        let stored = self.process_set(record)?;
        let fetched = self.process_get(record, context)?;
        Ok(stored || fetched)
    }

    /// Write mapped record fields to the remote cache as one batch.
    ///
    /// Mappings whose source field is absent contribute nothing; when every
    /// mapping is skipped this way no remote call happens at all.
    fn process_set(&self, record: &dyn Record) -> CacheResult<bool> {
        if self.set_mappings.is_empty() {
            return Ok(false);
        }

        let mut batch: Vec<(String, Value)> = Vec::with_capacity(self.set_mappings.len());
        for mapping in &self.set_mappings {
            let Some(value) = record.get(mapping.field_path()) else {
                trace!(field = mapping.field_path(), "Source field absent, skipping store");
                continue;
            };
            if value.is_null() {
                continue;
            }
            let key = mapping.expand(record);
            match batch.iter_mut().find(|(existing, _)| *existing == key) {
                // later mappings overwrite earlier ones expanding to the same key
                Some((_, slot)) => *slot = value,
                None => batch.push((key, value)),
            }
        }

        if batch.is_empty() {
            return Ok(false);
        }

        let handle = self.data_handle()?;
        handle.multi(&mut |remote| {
            for (key, value) in &batch {
                trace!(key = %key, "cache:set");
                remote.set(key, value)?;
            }
            Ok(())
        })?;
        Ok(true)
    }

    /// Resolve mapped keys and write the values into the record.
    ///
    /// The worker's local cache is consulted first; whatever remains is
    /// fetched in one batched round trip. Only values that actually resolved
    /// are cached locally, never misses.
    fn process_get(&self, record: &mut dyn Record, context: &mut WorkerContext) -> CacheResult<bool> {
        if self.get_mappings.is_empty() {
            return Ok(false);
        }

        let mut fields_by_key: Vec<(String, String)> = Vec::with_capacity(self.get_mappings.len());
        for mapping in &self.get_mappings {
            let key = mapping.expand(record);
            match fields_by_key.iter_mut().find(|(existing, _)| *existing == key) {
                // later mappings overwrite earlier ones expanding to the same key
                Some((_, field)) => *field = mapping.field_path().to_string(),
                None => fields_by_key.push((key, mapping.field_path().to_string())),
            }
        }

        let mut resolved: HashMap<String, Value> = HashMap::new();
        let mut remaining: Vec<String> = Vec::new();
        for (key, _) in &fields_by_key {
            match context.local_cache.get(key) {
                Some(value) => {
                    trace!(key = %key, worker_id = %context.worker_id, "cache:get local hit");
                    resolved.insert(key.clone(), value);
                }
                None => remaining.push(key.clone()),
            }
        }

        if !remaining.is_empty() {
            let handle = self.data_handle()?;
            let values = handle.get_multi(&remaining)?;
            for key in remaining {
                match values.get(&key) {
                    Some(value) if !value.is_null() => {
                        trace!(key = %key, "cache:get hit");
                        context.local_cache.put(&key, value.clone());
                        resolved.insert(key, value.clone());
                    }
                    _ => trace!(key = %key, "cache:get miss"),
                }
            }
        }

        let mut hits = 0;
        for (key, field) in &fields_by_key {
            if let Some(value) = resolved.get(key) {
                record.set(field, value.clone());
                hits += 1;
            }
        }
        Ok(hits > 0)
    }

    /// The live client handle, or a connection-class error when a concurrent
    /// close raced us
    fn data_handle(&self) -> CacheResult<Arc<dyn RemoteCache>> {
        self.connection
            .handle()
            .ok_or_else(|| CacheError::network("remote cache handle is closed"))
    }
}
