//! # Connection Manager
//!
//! Guards the one piece of state all workers share: the remote cache handle
//! and its availability flag. The flag is readable lock-free on the
//! per-record hot path; every handle mutation happens under a single
//! exclusive lock, and reconnects are double-checked so concurrent workers
//! never attempt more than one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::cache::remote::{CacheResult, ConnectionOptions, RemoteCache, RemoteCacheConnector};

/// Connection state shared across all workers.
///
/// Reconnecting is inherently exclusive: concurrent attempts waste
/// connections and could race on handle replacement. The already-connected
/// hot path must not pay for that exclusivity, so availability is a plain
/// atomic read and the lock is only ever taken on the failure path.
pub struct ConnectionManager {
    /// Cache endpoints used for every connect attempt
    hosts: Vec<String>,

    /// Client options applied on every connect attempt
    options: ConnectionOptions,

    /// Factory for new client handles
    connector: Box<dyn RemoteCacheConnector>,

    /// Fast-path availability flag (atomic for lock-free reads)
    connected: AtomicBool,

    /// Live client handle; the write guard doubles as the connection lock
    remote: RwLock<Option<Arc<dyn RemoteCache>>>,
}

impl ConnectionManager {
    /// Connect and verify liveness.
    ///
    /// A failure here is fatal: the filter refuses to register without an
    /// initial connection.
    pub fn establish(
        hosts: Vec<String>,
        options: ConnectionOptions,
        connector: Box<dyn RemoteCacheConnector>,
    ) -> CacheResult<Self> {
        let manager = Self {
            hosts,
            options,
            connector,
            connected: AtomicBool::new(false),
            remote: RwLock::new(None),
        };
        let handle = manager.connect_verified()?;
        *manager.remote.write() = Some(handle);
        manager.connected.store(true, Ordering::Release);
        info!(
            hosts = ?manager.hosts,
            namespace = manager.options.namespace.as_deref(),
            "🛡️ Remote cache connection established"
        );
        Ok(manager)
    }

    /// Cheap per-record availability gate.
    ///
    /// Fast path reads the flag without locking; a stale `true` under
    /// concurrent failure is tolerated because the next failing call corrects
    /// it. When the flag is down, the connection lock is taken, the flag
    /// re-checked (a concurrent worker may have already reconnected), and
    /// only then is a single reconnect attempted.
    pub fn ensure_available(&self) -> bool {
        if self.connected.load(Ordering::Acquire) {
            return true;
        }
        let mut remote = self.remote.write();
        if self.connected.load(Ordering::Acquire) {
            return true;
        }
        self.reconnect(&mut remote)
    }

    /// Record a connection-class failure.
    ///
    /// Lowers the flag without attempting any reconnect; that is deferred to
    /// the availability gate on the next record.
    pub fn mark_down(&self) {
        let _remote = self.remote.write();
        self.connected.store(false, Ordering::Release);
        debug!(hosts = ?self.hosts, "Remote cache marked down");
    }

    /// Release the client handle and lower the flag.
    ///
    /// Best effort: close-time errors never escape.
    pub fn close(&self) {
        let mut remote = self.remote.write();
        self.connected.store(false, Ordering::Release);
        if let Some(handle) = remote.take() {
            handle.close();
            debug!(hosts = ?self.hosts, "Remote cache connection released");
        }
    }

    /// Clone the live handle for a data-path call.
    ///
    /// `None` means a concurrent close got there first; callers treat that as
    /// a connection-class failure.
    pub fn handle(&self) -> Option<Arc<dyn RemoteCache>> {
        self.remote.read().clone()
    }

    /// Current flag value without side effects
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Build a new client handle and verify it responds
    fn connect_verified(&self) -> CacheResult<Arc<dyn RemoteCache>> {
        debug!(
            hosts = ?self.hosts,
            namespace = self.options.namespace.as_deref(),
            "Connecting to remote cache"
        );
        let handle = self.connector.connect(&self.hosts, &self.options)?;
        handle.alive()?;
        Ok(handle)
    }

    /// Attempt one reconnect. Must be called with the write guard held.
    fn reconnect(&self, remote: &mut Option<Arc<dyn RemoteCache>>) -> bool {
        match self.connect_verified() {
            Ok(handle) => {
                *remote = Some(handle);
                self.connected.store(true, Ordering::Release);
                info!(hosts = ?self.hosts, "🟢 Reconnected to remote cache");
                true
            }
            Err(error) => {
                self.connected.store(false, Ordering::Release);
                error!(
                    error = %error,
                    hosts = ?self.hosts,
                    namespace = self.options.namespace.as_deref(),
                    "🔴 Failed to reconnect to remote cache"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryConnector;
    use crate::cache::remote::CacheError;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Connector counting connect attempts, optionally failing the next N
    struct CountingConnector {
        inner: InMemoryConnector,
        connects: AtomicUsize,
        failures_remaining: AtomicUsize,
    }

    impl CountingConnector {
        fn new() -> Self {
            Self {
                inner: InMemoryConnector::new(),
                connects: AtomicUsize::new(0),
                failures_remaining: AtomicUsize::new(0),
            }
        }

        fn fail_next(&self, count: usize) {
            self.failures_remaining.store(count, Ordering::SeqCst);
        }

        fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    impl RemoteCacheConnector for CountingConnector {
        fn connect(
            &self,
            hosts: &[String],
            options: &ConnectionOptions,
        ) -> CacheResult<Arc<dyn RemoteCache>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(CacheError::network("connection refused"));
            }
            self.inner.connect(hosts, options)
        }
    }

    /// Handle that connects fine but fails the liveness check
    struct DeadOnArrival;

    impl RemoteCache for DeadOnArrival {
        fn alive(&self) -> CacheResult<()> {
            Err(CacheError::network("no response to version"))
        }

        fn get_multi(
            &self,
            _keys: &[String],
        ) -> CacheResult<HashMap<String, serde_json::Value>> {
            Ok(HashMap::new())
        }

        fn set(&self, _key: &str, _value: &serde_json::Value) -> CacheResult<()> {
            Ok(())
        }

        fn multi(
            &self,
            block: &mut dyn FnMut(&dyn RemoteCache) -> CacheResult<()>,
        ) -> CacheResult<()> {
            block(self)
        }

        fn close(&self) {}
    }

    struct DeadOnArrivalConnector;

    impl RemoteCacheConnector for DeadOnArrivalConnector {
        fn connect(
            &self,
            _hosts: &[String],
            _options: &ConnectionOptions,
        ) -> CacheResult<Arc<dyn RemoteCache>> {
            Ok(Arc::new(DeadOnArrival))
        }
    }

    fn manager_with(connector: Box<dyn RemoteCacheConnector>) -> CacheResult<ConnectionManager> {
        ConnectionManager::establish(
            vec!["localhost".to_string()],
            ConnectionOptions::default(),
            connector,
        )
    }

    #[test]
    fn test_establish_connects_and_raises_flag() {
        let manager = manager_with(Box::new(CountingConnector::new())).unwrap();
        assert!(manager.is_connected());
        assert!(manager.handle().is_some());
    }

    #[test]
    fn test_establish_fails_when_unreachable() {
        let connector = CountingConnector::new();
        connector.fail_next(1);
        let result = manager_with(Box::new(connector));
        assert!(matches!(result, Err(CacheError::Network { .. })));
    }

    #[test]
    fn test_establish_fails_when_liveness_check_fails() {
        let result = manager_with(Box::new(DeadOnArrivalConnector));
        assert!(matches!(result, Err(CacheError::Network { .. })));
    }

    #[test]
    fn test_fast_path_does_not_reconnect() {
        let connector = Arc::new(CountingConnector::new());
        let manager = ConnectionManager::establish(
            vec!["localhost".to_string()],
            ConnectionOptions::default(),
            Box::new(SharedConnector(Arc::clone(&connector))),
        )
        .unwrap();

        assert!(manager.ensure_available());
        assert!(manager.ensure_available());
        assert_eq!(connector.connect_count(), 1);
    }

    #[test]
    fn test_mark_down_defers_reconnect_to_next_gate() {
        let connector = Arc::new(CountingConnector::new());
        let manager = ConnectionManager::establish(
            vec!["localhost".to_string()],
            ConnectionOptions::default(),
            Box::new(SharedConnector(Arc::clone(&connector))),
        )
        .unwrap();

        manager.mark_down();
        assert!(!manager.is_connected());
        assert_eq!(connector.connect_count(), 1);

        assert!(manager.ensure_available());
        assert!(manager.is_connected());
        assert_eq!(connector.connect_count(), 2);
    }

    #[test]
    fn test_failed_reconnect_leaves_flag_down() {
        let connector = Arc::new(CountingConnector::new());
        let manager = ConnectionManager::establish(
            vec!["localhost".to_string()],
            ConnectionOptions::default(),
            Box::new(SharedConnector(Arc::clone(&connector))),
        )
        .unwrap();

        manager.mark_down();
        connector.fail_next(1);
        assert!(!manager.ensure_available());
        assert!(!manager.is_connected());
        assert_eq!(connector.connect_count(), 2);

        // the outage clears and the next gate reconnects
        assert!(manager.ensure_available());
        assert_eq!(connector.connect_count(), 3);
    }

    #[test]
    fn test_close_releases_handle_and_is_idempotent() {
        let manager = manager_with(Box::new(CountingConnector::new())).unwrap();
        manager.close();
        assert!(!manager.is_connected());
        assert!(manager.handle().is_none());
        manager.close();
        assert!(manager.handle().is_none());
    }

    #[test]
    fn test_concurrent_gates_reconnect_exactly_once() {
        let connector = Arc::new(CountingConnector::new());
        let manager = Arc::new(
            ConnectionManager::establish(
                vec!["localhost".to_string()],
                ConnectionOptions::default(),
                Box::new(SharedConnector(Arc::clone(&connector))),
            )
            .unwrap(),
        );

        manager.mark_down();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.ensure_available())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        // one establish plus exactly one reconnect across all workers
        assert_eq!(connector.connect_count(), 2);
    }

    /// Wrapper letting tests keep a counting handle while the manager owns the box
    struct SharedConnector(Arc<CountingConnector>);

    impl RemoteCacheConnector for SharedConnector {
        fn connect(
            &self,
            hosts: &[String],
            options: &ConnectionOptions,
        ) -> CacheResult<Arc<dyn RemoteCache>> {
            self.0.connect(hosts, options)
        }
    }
}
