//! The connection pool (§4.6, §5).
//!
//! State is protected by a single mutex; waiters that arrive when the pool is
//! saturated are represented as one-shot condition-variable notifications
//! (Design Note §9), served strictly FIFO.

pub mod cache;
pub mod config;
pub mod connection;
pub mod stats;

use crate::error::{Result, StoreError};
use crate::pool::cache::ResultCache;
use crate::pool::config::PoolConfig;
use crate::pool::connection::PooledConnection;
use crate::pool::stats::{PoolCounters, PoolStats};
use crate::value::Row;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The outcome delivered to a parked waiter.
enum WaiterOutcome {
    Granted(Box<PooledConnection>),
    Closing,
}

struct Waiter {
    slot: Arc<(Mutex<Option<WaiterOutcome>>, Condvar)>,
    enqueued_at: Instant,
}

struct PoolState {
    available: VecDeque<PooledConnection>,
    in_use_count: usize,
    waiters: VecDeque<Waiter>,
    closing: bool,
    next_id: u64,
}

impl PoolState {
    fn total_count(&self) -> usize {
        self.available.len() + self.in_use_count
    }
}

/// A hand-rolled connection pool over SQLite connections.
pub struct Pool {
    path: PathBuf,
    config: PoolConfig,
    state: Mutex<PoolState>,
    counters: Mutex<PoolCounters>,
    result_cache: Mutex<ResultCache>,
    stop: Arc<AtomicBool>,
    reaper_handle: Mutex<Option<JoinHandle<()>>>,
    health_handle: Mutex<Option<JoinHandle<()>>>,
}

/// A checked-out connection. Returns itself to the pool on drop.
pub struct PoolGuard {
    pool: Arc<Pool>,
    connection: Option<PooledConnection>,
}

impl std::fmt::Debug for PoolGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGuard")
            .field("has_connection", &self.connection.is_some())
            .finish()
    }
}

impl std::ops::Deref for PoolGuard {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection.as_ref().expect("connection present until drop").handle
    }
}

impl PoolGuard {
    /// Record a statement run against this checked-out connection, updating
    /// its `queryCount`/`errorCount` bookkeeping (§4.6 `PooledConnection`).
    pub fn record_query(&mut self, succeeded: bool) {
        let enable_logging = self.pool.config.enable_logging;
        if let Some(conn) = self.connection.as_mut() {
            conn.query_count += 1;
            if !succeeded {
                conn.error_count += 1;
            }
            if enable_logging {
                tracing::debug!(
                    connection_id = conn.id,
                    succeeded,
                    query_count = conn.query_count,
                    error_count = conn.error_count,
                    "pool connection executed a query"
                );
            }
        }
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.pool.release(conn);
        }
    }
}

impl Pool {
    /// Open a new pool against `path`, eagerly creating `min_connections`
    /// connections and starting the reaper and (if enabled) health-check
    /// background threads (§4.6 Initialization).
    pub fn open(path: PathBuf, config: PoolConfig) -> Result<Arc<Self>> {
        let mut available = VecDeque::new();
        let mut next_id = 0_u64;
        for _ in 0..config.min_connections {
            let conn = PooledConnection::open(next_id, &path, config.enable_statement_cache)?;
            next_id += 1;
            available.push_back(conn);
        }

        let pool = Arc::new(Self {
            path,
            config,
            state: Mutex::new(PoolState {
                available,
                in_use_count: 0,
                waiters: VecDeque::new(),
                closing: false,
                next_id,
            }),
            counters: Mutex::new(PoolCounters::default()),
            result_cache: Mutex::new(ResultCache::new(config.max_cache_entries)),
            stop: Arc::new(AtomicBool::new(false)),
            reaper_handle: Mutex::new(None),
            health_handle: Mutex::new(None),
        });
        {
            let mut counters = pool.counters.lock().expect("counters mutex poisoned");
            counters.total_created += u64::try_from(config.min_connections).unwrap_or(0);
        }
        pool.spawn_background_threads();
        Ok(pool)
    }

    fn spawn_background_threads(self: &Arc<Self>) {
        let reap_weak: Weak<Self> = Arc::downgrade(self);
        let reap_stop = self.stop.clone();
        let reap_interval = Duration::from_millis(self.config.reap_interval_ms);
        let reaper = std::thread::spawn(move || {
            run_periodic(&reap_stop, reap_interval, || {
                if let Some(pool) = reap_weak.upgrade() {
                    pool.reap_idle();
                    true
                } else {
                    false
                }
            });
        });
        *self.reaper_handle.lock().expect("reaper handle mutex poisoned") = Some(reaper);

        if self.config.enable_health_checks {
            let health_weak: Weak<Self> = Arc::downgrade(self);
            let health_stop = self.stop.clone();
            let health_interval = Duration::from_millis(self.config.reap_interval_ms * 2);
            let health = std::thread::spawn(move || {
                run_periodic(&health_stop, health_interval, || {
                    if let Some(pool) = health_weak.upgrade() {
                        pool.health_check();
                        true
                    } else {
                        false
                    }
                });
            });
            *self.health_handle.lock().expect("health handle mutex poisoned") = Some(health);
        }
    }

    /// Acquire a connection, following §4.6 acquire semantics: reuse an
    /// idle connection, else open a new one below `max_connections`, else
    /// park as a FIFO waiter until release or `acquire_timeout_ms` elapses.
    pub fn acquire(self: &Arc<Self>) -> Result<PoolGuard> {
        let start = Instant::now();
        let mut state = self.state.lock().expect("pool state mutex poisoned");

        if state.closing {
            return Err(StoreError::PoolClosing);
        }

        if let Some(mut conn) = state.available.pop_front() {
            conn.in_use = true;
            conn.touch();
            state.in_use_count += 1;
            drop(state);
            self.record_acquire(start.elapsed());
            return Ok(self.guard(conn));
        }

        if state.total_count() < usize::try_from(self.config.max_connections).unwrap_or(usize::MAX) {
            let id = state.next_id;
            state.next_id += 1;
            drop(state);
            let mut conn = PooledConnection::open(id, &self.path, self.config.enable_statement_cache)?;
            conn.in_use = true;
            let mut state = self.state.lock().expect("pool state mutex poisoned");
            state.in_use_count += 1;
            drop(state);
            self.counters.lock().expect("counters mutex poisoned").total_created += 1;
            tracing::debug!(connection_id = id, "pool connection created");
            self.record_acquire(start.elapsed());
            return Ok(self.guard(conn));
        }

        let slot = Arc::new((Mutex::new(None::<WaiterOutcome>), Condvar::new()));
        state.waiters.push_back(Waiter { slot: slot.clone(), enqueued_at: start });
        drop(state);

        let (lock, cvar) = &*slot;
        let guard = lock.lock().expect("waiter slot mutex poisoned");
        let timeout = Duration::from_millis(self.config.acquire_timeout_ms);
        let (mut outcome, wait_result) = cvar
            .wait_timeout_while(guard, timeout, |o| o.is_none())
            .expect("waiter condvar wait poisoned");

        if wait_result.timed_out() && outcome.is_none() {
            drop(outcome);
            let mut state = self.state.lock().expect("pool state mutex poisoned");
            state.waiters.retain(|w| !Arc::ptr_eq(&w.slot, &slot));
            drop(state);
            self.counters.lock().expect("counters mutex poisoned").total_errors += 1;
            let waited_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(waited_ms, "timed out acquiring a pooled connection");
            return Err(StoreError::AcquireTimeout { waited_ms });
        }

        match outcome.take() {
            Some(WaiterOutcome::Granted(conn)) => {
                self.record_acquire(start.elapsed());
                Ok(self.guard(*conn))
            }
            Some(WaiterOutcome::Closing) | None => Err(StoreError::PoolClosing),
        }
    }

    fn guard(self: &Arc<Self>, connection: PooledConnection) -> PoolGuard {
        PoolGuard { pool: Arc::clone(self), connection: Some(connection) }
    }

    fn record_acquire(&self, elapsed: Duration) {
        let mut counters = self.counters.lock().expect("counters mutex poisoned");
        counters.total_acquired += 1;
        counters.acquire_times.record(elapsed);
    }

    /// Return a connection to the pool (§4.6 Release semantics).
    fn release(&self, mut conn: PooledConnection) {
        conn.in_use = false;
        conn.touch();

        let mut state = self.state.lock().expect("pool state mutex poisoned");
        state.in_use_count -= 1;

        if state.closing {
            drop(state);
            self.counters.lock().expect("counters mutex poisoned").total_destroyed += 1;
            self.counters.lock().expect("counters mutex poisoned").total_released += 1;
            return;
        }

        if u64::try_from(conn.age().as_millis()).unwrap_or(u64::MAX) >= self.config.max_connection_age_ms {
            drop(state);
            let mut counters = self.counters.lock().expect("counters mutex poisoned");
            counters.total_destroyed += 1;
            counters.total_released += 1;
            return;
        }

        if let Some(waiter) = state.waiters.pop_front() {
            conn.in_use = true;
            state.in_use_count += 1;
            drop(state);
            let (lock, cvar) = &*waiter.slot;
            let mut outcome = lock.lock().expect("waiter slot mutex poisoned");
            *outcome = Some(WaiterOutcome::Granted(Box::new(conn)));
            drop(outcome);
            cvar.notify_one();
            let mut counters = self.counters.lock().expect("counters mutex poisoned");
            counters.total_acquired += 1;
            counters.total_released += 1;
            counters.acquire_times.record(waiter.enqueued_at.elapsed());
            return;
        }

        state.available.push_back(conn);
        drop(state);
        self.counters.lock().expect("counters mutex poisoned").total_released += 1;
    }

    /// Idle eviction: destroy any not-in-use connection idle longer than
    /// `idle_timeout_ms`, provided doing so keeps at least `min_connections`
    /// alive (§4.6 Idle reaping).
    fn reap_idle(&self) {
        let mut state = self.state.lock().expect("pool state mutex poisoned");
        let idle_timeout = Duration::from_millis(self.config.idle_timeout_ms);
        let min_connections = usize::try_from(self.config.min_connections).unwrap_or(usize::MAX);
        let mut survivors = VecDeque::with_capacity(state.available.len());
        let mut destroyed = 0_u64;

        while let Some(conn) = state.available.pop_front() {
            let total_remaining = survivors.len() + state.available.len() + state.in_use_count;
            if conn.idle_for() > idle_timeout && total_remaining > min_connections {
                destroyed += 1;
            } else {
                survivors.push_back(conn);
            }
        }
        state.available = survivors;
        drop(state);

        if destroyed > 0 {
            self.counters.lock().expect("counters mutex poisoned").total_destroyed += destroyed;
        }
        self.result_cache.lock().expect("result cache mutex poisoned").purge_expired();
    }

    /// Probe every idle connection with `SELECT 1`; destroy on failure
    /// (§4.6 Health check).
    fn health_check(&self) {
        let mut state = self.state.lock().expect("pool state mutex poisoned");
        let mut survivors = VecDeque::with_capacity(state.available.len());
        let mut destroyed = 0_u64;

        while let Some(conn) = state.available.pop_front() {
            if conn.is_healthy() {
                survivors.push_back(conn);
            } else {
                tracing::warn!(connection_id = conn.id, "pool health probe failed, destroying connection");
                destroyed += 1;
            }
        }
        state.available = survivors;
        drop(state);

        if destroyed > 0 {
            self.counters.lock().expect("counters mutex poisoned").total_destroyed += destroyed;
        }
    }

    /// Shut the pool down: stop background threads, reject every waiting
    /// caller with `PoolClosing`, drop all idle connections, and clear
    /// cached state (§4.6 Shutdown).
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reaper_handle.lock().expect("reaper handle mutex poisoned").take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.health_handle.lock().expect("health handle mutex poisoned").take() {
            let _ = handle.join();
        }

        let mut state = self.state.lock().expect("pool state mutex poisoned");
        state.closing = true;
        for waiter in state.waiters.drain(..) {
            let (lock, cvar) = &*waiter.slot;
            let mut outcome = lock.lock().expect("waiter slot mutex poisoned");
            *outcome = Some(WaiterOutcome::Closing);
            drop(outcome);
            cvar.notify_one();
        }
        let destroyed = state.available.len();
        state.available.clear();
        drop(state);

        self.counters.lock().expect("counters mutex poisoned").total_destroyed += destroyed as u64;
        self.result_cache.lock().expect("result cache mutex poisoned").clear();
        tracing::debug!(destroyed, "pool shut down");
    }

    /// A point-in-time snapshot of pool health (§4.6 Statistics).
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock().expect("pool state mutex poisoned");
        let counters = self.counters.lock().expect("counters mutex poisoned");
        let cache = self.result_cache.lock().expect("result cache mutex poisoned");
        PoolStats {
            total_connections: state.total_count(),
            active_connections: state.in_use_count,
            idle_connections: state.available.len(),
            waiting_clients: state.waiters.len(),
            total_created: counters.total_created,
            total_destroyed: counters.total_destroyed,
            total_acquired: counters.total_acquired,
            total_released: counters.total_released,
            total_errors: counters.total_errors,
            average_acquire_time_ms: counters.acquire_times.average_ms(),
            cache_hit_rate: cache.hit_rate(),
        }
    }

    /// Look up a cached query result, when the caller opted in (§4.6 Result cache).
    pub fn cache_get(&self, key: &str) -> Option<Vec<Row>> {
        if !self.config.enable_result_cache {
            return None;
        }
        self.result_cache.lock().expect("result cache mutex poisoned").get(key)
    }

    /// Insert a query result into the cache under `key` with the given TTL.
    pub fn cache_insert(&self, key: String, rows: Vec<Row>, ttl: Duration) {
        if !self.config.enable_result_cache {
            return;
        }
        self.result_cache.lock().expect("result cache mutex poisoned").insert(key, rows, ttl);
    }

    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// Sleep in short slices so `stop` is observed promptly, invoking `tick` at
/// each `interval` boundary until `tick` signals the owning pool is gone.
fn run_periodic(stop: &AtomicBool, interval: Duration, mut tick: impl FnMut() -> bool) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut elapsed = Duration::ZERO;
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(SLICE.min(interval));
        elapsed += SLICE;
        if elapsed >= interval {
            elapsed = Duration::ZERO;
            if !tick() {
                return;
            }
        }
    }
}
