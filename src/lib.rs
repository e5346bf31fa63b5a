#![allow(clippy::doc_markdown)] // Allow technical terms like memcached, serde in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Memcached Filter Core
//!
//! Resilient memcached caching core for record pipelines.
//!
//! ## Overview
//!
//! This crate implements the cache-access core of a pipeline filter: records
//! flowing through a host pipeline are enriched from (and written to) a
//! memcached-style remote store, keyed by templates expanded per record. The
//! host owns the pipeline surface; this core owns key construction, batching,
//! local caching, and connection resilience.
//!
//! ## Architecture
//!
//! A single [`filter::MemcachedFilter`] is shared by all pipeline workers.
//! Each worker holds its own [`filter::WorkerContext`] with a private
//! [`cache::LocalCache`], so the only cross-worker state is the connection
//! itself, guarded by [`connection::ConnectionManager`]. The availability
//! flag is read lock-free per record; reconnects are exclusive and
//! double-checked.
//!
//! ## Key Features
//!
//! - **Batched lookups**: all get-mappings resolve in one `get_multi` round trip
//! - **Per-worker local cache**: bounded LRU with lazy TTL expiry, zero locking
//! - **Connection recovery**: failures tag the record, never break the pipeline;
//!   the next record triggers exactly one reconnect attempt
//! - **Template keys**: `%{field}` placeholders expand against each record
//!
//! ## Module Organization
//!
//! - [`filter`] - Per-record orchestration, worker contexts, outcomes
//! - [`connection`] - Shared connection state and reconnect policy
//! - [`cache`] - Local cache, remote cache seam, in-memory backend
//! - [`record`] - Record trait, field locators, template expansion
//! - [`mapping`] - Compiled key-template mapping tables
//! - [`config`] - Configuration surface, validation, YAML loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing initialization
//!
//! ## Quick Start
//!
//! ```rust
//! use memcached_filter_core::cache::InMemoryConnector;
//! use memcached_filter_core::filter::MemcachedFilter;
//! use memcached_filter_core::record::{JsonRecord, Record};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = memcached_filter_core::config::load_from_str(
//!     r#"
//! hosts: ["localhost:11211"]
//! set:
//!   "[name]": "user:%{id}"
//! get:
//!   "user:%{id}": "[cached_name]"
//! "#,
//! )?;
//!
//! let filter = MemcachedFilter::new(config, Box::new(InMemoryConnector::new()))?;
//! let mut worker = filter.worker_context();
//!
//! let mut record = JsonRecord::new();
//! record.set("id", json!("42"));
//! record.set("name", json!("Alice"));
//!
//! let outcome = filter.process(&mut record, &mut worker);
//! assert!(outcome.is_matched());
//! assert_eq!(record.get("[cached_name]"), Some(json!("Alice")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration
//!
//! The host pipeline implements [`record::Record`] over its own event type
//! and [`cache::RemoteCache`] over its client of choice; the shipped
//! [`record::JsonRecord`] and [`cache::InMemoryRemoteCache`] cover standalone
//! pipelines and tests.

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod filter;
pub mod logging;
pub mod mapping;
pub mod record;
pub mod utils;

pub use cache::{
    CacheError, CacheResult, ConnectionOptions, InMemoryConnector, InMemoryRemoteCache,
    LocalCache, LocalCacheStats, RemoteCache, RemoteCacheConnector,
};
pub use config::{ConfigurationError, FilterConfig, LocalCacheConfig};
pub use connection::ConnectionManager;
pub use error::{FilterError, Result};
pub use filter::{MemcachedFilter, ProcessOutcome, WorkerContext};
pub use mapping::KeyMapping;
pub use record::{JsonRecord, Record};
