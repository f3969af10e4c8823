//! Connection pool + health: a per-key idle stack of
//! [`NfsClient`]s with lease semantics, a maintenance sweep that disposes
//! stale idle connections, and a health checker that degrades/recovers a
//! key's status on consecutive probe failures.
//!
//! This component has no knowledge of protocol details — it only ever
//! calls the façade's uniform surface.

mod health;

pub use health::{HealthState, HealthStatus};

use crate::error::Error;
use crate::facade::events::{EventBus, HealthChange};
use crate::facade::options::{ConnectOptions, NfsVersion};
use crate::facade::NfsClient;
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Default per-key connection ceiling.
pub const DEFAULT_MAX_POOL_SIZE: usize = 8;
/// Default idle-connection lifetime before [`ConnectionPool::maintain`]
/// disposes it.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default interval between maintenance sweeps.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// `(server_address, export, version, user_id, group_id, secure_port_flag)`:
/// the identity a pooled connection is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub server: IpAddr,
    pub export: String,
    pub version: NfsVersion,
    pub user_id: u32,
    pub group_id: u32,
    pub use_secure_port: bool,
}

impl PoolKey {
    pub fn new(server: IpAddr, export: impl Into<String>, options: &ConnectOptions, version: NfsVersion) -> Self {
        PoolKey {
            server,
            export: export.into(),
            version,
            user_id: options.user_id,
            group_id: options.group_id,
            use_secure_port: options.use_secure_port,
        }
    }
}

struct IdleConn {
    client: NfsClient,
    last_used_at: Instant,
}

struct KeyState {
    idle: Vec<IdleConn>,
    leased_count: usize,
    health: HealthState,
    /// Woken whenever a slot might have freed up for this key — a release,
    /// a failed connect giving back its reservation, or maintenance
    /// disposing idle connections. Callers blocked in [`ConnectionPool::get_connection`]
    /// wait on this instead of failing fast.
    notify: Arc<Notify>,
}

impl KeyState {
    fn new() -> Self {
        KeyState { idle: Vec::new(), leased_count: 0, health: HealthState::new(), notify: Arc::new(Notify::new()) }
    }

    fn total(&self) -> usize {
        self.idle.len() + self.leased_count
    }
}

/// A leased connection. The caller returns it to the pool with
/// [`ConnectionPool::release`]; dropping a lease without releasing it
/// simply removes it from circulation (the underlying socket closes when
/// the client is dropped), matching "a leased connection is not visible to
/// other callers" without requiring the caller to release on every path.
pub struct Lease {
    key: PoolKey,
    client: Option<NfsClient>,
}

impl Lease {
    pub fn client(&self) -> &NfsClient {
        self.client.as_ref().expect("lease client taken twice")
    }

    pub fn client_mut(&mut self) -> &mut NfsClient {
        self.client.as_mut().expect("lease client taken twice")
    }
}

/// Aggregate pool-wide counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub total_connections: usize,
    pub available_connections: usize,
}

pub struct ConnectionPool {
    max_pool_size: usize,
    idle_timeout: Duration,
    health_threshold: u32,
    state: Mutex<HashMap<PoolKey, KeyState>>,
    health_events: EventBus<(PoolKey, HealthChange)>,
}

impl ConnectionPool {
    pub fn new(max_pool_size: usize, idle_timeout: Duration) -> Self {
        ConnectionPool {
            max_pool_size,
            idle_timeout,
            health_threshold: health::DEFAULT_FAILURE_THRESHOLD,
            state: Mutex::new(HashMap::new()),
            health_events: EventBus::new(),
        }
    }

    pub fn subscribe_health(&self, capacity: usize) -> async_channel::Receiver<(PoolKey, HealthChange)> {
        self.health_events.subscribe(capacity)
    }

    /// Leases an idle connection for `key`, or constructs one via `connect`
    /// if the per-key count hasn't reached `max_pool_size`. If the key is
    /// already at capacity, blocks until a slot frees up instead of failing
    /// fast — no caller is starved indefinitely, since every release,
    /// failed-connect rollback, and maintenance disposal wakes every
    /// waiter for this key to re-check.
    pub async fn get_connection<F, Fut>(&self, key: PoolKey, connect: F) -> Result<Lease, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<NfsClient, Error>>,
    {
        enum Slot {
            Idle(NfsClient),
            Reserved,
        }

        let slot = loop {
            // `notified()` snapshots the notify generation before the state
            // check below, so a release/rollback/disposal racing in between
            // is never missed even though the lock isn't held across the
            // `.await`.
            let notify = {
                let mut state = self.state.lock().unwrap();
                state.entry(key.clone()).or_insert_with(KeyState::new).notify.clone()
            };
            let notified = notify.notified();

            let outcome = {
                let mut state = self.state.lock().unwrap();
                let entry = state.entry(key.clone()).or_insert_with(KeyState::new);
                if let Some(idle) = entry.idle.pop() {
                    entry.leased_count += 1;
                    Some(Slot::Idle(idle.client))
                } else if entry.total() < self.max_pool_size {
                    entry.leased_count += 1;
                    Some(Slot::Reserved)
                } else {
                    None
                }
            };

            match outcome {
                Some(slot) => break slot,
                None => {
                    debug!(server = ?key.server, "pool: waiting for a free slot");
                    notified.await;
                }
            }
        };

        match slot {
            Slot::Idle(client) => {
                debug!(server = ?key.server, "pool: reused idle connection");
                Ok(Lease { key, client: Some(client) })
            }
            Slot::Reserved => match connect().await {
                Ok(client) => {
                    debug!(server = ?key.server, "pool: established new connection");
                    Ok(Lease { key, client: Some(client) })
                }
                Err(e) => {
                    let mut state = self.state.lock().unwrap();
                    if let Some(entry) = state.get_mut(&key) {
                        entry.leased_count -= 1;
                        entry.notify.notify_waiters();
                    }
                    Err(e)
                }
            },
        }
    }

    /// Returns a leased connection to the idle pool with a fresh
    /// `last_used_at`, waking any caller blocked in [`Self::get_connection`]
    /// for this key.
    pub fn release(&self, mut lease: Lease) {
        let client = lease.client.take().expect("lease client taken twice");
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.get_mut(&lease.key) {
            entry.leased_count = entry.leased_count.saturating_sub(1);
            entry.idle.push(IdleConn { client, last_used_at: Instant::now() });
            entry.notify.notify_waiters();
        }
    }

    /// Disposes idle connections older than `idle_timeout`. Intended to be
    /// driven on [`MAINTENANCE_INTERVAL`] by the embedding application.
    pub fn maintain(&self) {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        for (key, entry) in state.iter_mut() {
            let before = entry.idle.len();
            entry.idle.retain(|c| now.duration_since(c.last_used_at) < self.idle_timeout);
            let disposed = before - entry.idle.len();
            if disposed > 0 {
                debug!(server = ?key.server, disposed, "pool: maintenance disposed idle connections");
                entry.notify.notify_waiters();
            }
        }
        state.retain(|_, entry| entry.total() > 0);
    }

    /// Health probe for `key`: leases an idle connection if one exists,
    /// issues [`NfsClient::health_check`], and releases it back, updating
    /// the key's [`HealthStatus`] per the configured failure threshold. A key
    /// with no idle connection to probe is left unchanged.
    pub async fn check_health(&self, key: &PoolKey) -> Option<HealthChange> {
        let idle = {
            let mut state = self.state.lock().unwrap();
            let entry = state.get_mut(key)?;
            let conn = entry.idle.pop()?;
            entry.leased_count += 1;
            conn
        };

        let IdleConn { mut client, .. } = idle;
        let result = client.health_check().await;

        let mut state = self.state.lock().unwrap();
        let entry = state.get_mut(key)?;
        entry.leased_count -= 1;
        entry.idle.push(IdleConn { client, last_used_at: Instant::now() });

        let change = entry.health.record(result.is_ok(), self.health_threshold);
        if let Some(change) = change {
            warn!(server = ?key.server, old = ?change.old, new = ?change.new, "pool: health status changed");
            self.health_events.emit((key.clone(), change));
        }
        change
    }

    pub fn stats(&self, key: &PoolKey) -> PoolStats {
        let state = self.state.lock().unwrap();
        match state.get(key) {
            Some(entry) => PoolStats {
                total_connections: entry.total(),
                available_connections: entry.idle.len(),
            },
            None => PoolStats::default(),
        }
    }

    /// Disposes every connection across every key. Leased connections are
    /// dropped only once their lease is released; this clears idle ones
    /// immediately and leaves bookkeeping for the rest to drain naturally.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        for entry in state.values_mut() {
            entry.idle.clear();
        }
        state.clear();
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOL_SIZE, DEFAULT_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::options::{ConnectOptions, NfsVersion};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn key() -> PoolKey {
        PoolKey::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), "/srv/nfs", &ConnectOptions::default(), NfsVersion::V3)
    }

    fn fresh_client() -> NfsClient {
        NfsClient::new(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            NfsVersion::V3,
            ConnectOptions::default(),
        )
    }

    #[tokio::test]
    async fn get_connection_blocks_until_a_slot_frees_at_max_pool_size() {
        let pool = Arc::new(ConnectionPool::new(2, DEFAULT_IDLE_TIMEOUT));
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        let lease1 = pool
            .get_connection(key(), || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok(fresh_client())
            })
            .await
            .unwrap();

        let c2 = calls.clone();
        let lease2 = pool
            .get_connection(key(), || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(fresh_client())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let waiting_pool = pool.clone();
        let c3 = calls.clone();
        let waiter = tokio::spawn(async move {
            waiting_pool
                .get_connection(key(), || async move {
                    c3.fetch_add(1, Ordering::SeqCst);
                    Ok(fresh_client())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "third lease should block while the pool is full, not fail");

        pool.release(lease1);
        let third = waiter.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        pool.release(lease2);
        pool.release(third);
        assert_eq!(pool.stats(&key()).available_connections, 2);
    }

    #[tokio::test]
    async fn released_connection_is_reused_without_reconnecting() {
        let pool = ConnectionPool::new(4, DEFAULT_IDLE_TIMEOUT);
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        let lease = pool.get_connection(key(), || async move {
            c1.fetch_add(1, Ordering::SeqCst);
            Ok(fresh_client())
        }).await.unwrap();
        pool.release(lease);

        let c2 = calls.clone();
        let _lease = pool.get_connection(key(), || async move {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(fresh_client())
        }).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "second get_connection should reuse the idle slot");
    }

    #[tokio::test]
    async fn maintain_disposes_idle_connections_past_timeout() {
        let pool = ConnectionPool::new(4, Duration::from_millis(5));
        let lease = pool.get_connection(key(), || async { Ok(fresh_client()) }).await.unwrap();
        pool.release(lease);
        assert_eq!(pool.stats(&key()).available_connections, 1);

        tokio::time::sleep(Duration::from_millis(15)).await;
        pool.maintain();
        assert_eq!(pool.stats(&key()).available_connections, 0);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let a = PoolKey::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), "/a", &ConnectOptions::default(), NfsVersion::V3);
        let b = PoolKey::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), "/b", &ConnectOptions::default(), NfsVersion::V3);
        assert_ne!(a, b);
    }
}
