//! Per-endpoint connection pool
//!
//! A pool owns every connection it has dialed for one address. It starts
//! with a floor of eagerly dialed connections, grows one connection per
//! acquire miss up to its ceiling and fails fast once the ceiling is
//! reached. A background task active-tests idle connections with `ACTIVE_TEST`
//! and evicts the dead ones; it never refills.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{Notify, broadcast};
use tracing::{debug, info, warn};

use super::PoolStatus;
use super::connection::PooledConnection;
use super::dial;
use super::health_check::{HealthCheckMetrics, check_active_test};
use crate::constants::pool::{
    DEFAULT_MAX_CONNECTIONS, HEALTH_CHECK_INTERVAL, HEALTH_CHECK_TIMEOUT, MIN_CONNECTIONS,
};
use crate::constants::timeout;
use crate::error::{ClientError, Result};
use crate::types::{AvailableConnections, MaxPoolSize, OpenConnections};


/// Settings shared by every pool a registry creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Ceiling: idle plus checked-out connections never exceed this
    pub max_size: usize,
    /// Floor: connections dialed before the pool is handed out
    pub min_size: usize,
    pub dial_timeout: Duration,
    pub network_timeout: Duration,
    pub health_check_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_CONNECTIONS,
            min_size: MIN_CONNECTIONS,
            dial_timeout: timeout::DIAL,
            network_timeout: timeout::NETWORK,
            health_check_interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

impl PoolOptions {
    fn validate(&self) -> Result<()> {
        if self.max_size < MIN_CONNECTIONS {
            return Err(ClientError::config(format!(
                "max connections {} is below the minimum of {MIN_CONNECTIONS}",
                self.max_size
            )));
        }
        if self.min_size > self.max_size {
            return Err(ClientError::config(format!(
                "pool floor {} exceeds ceiling {}",
                self.min_size, self.max_size
            )));
        }
        if self.health_check_interval.is_zero() {
            return Err(ClientError::config(
                "health check interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConnectionPool`]
///
/// # Examples
///
/// ```no_run
/// use fdfs_client::pool::ConnectionPool;
/// use std::time::Duration;
///
/// # async fn example() -> fdfs_client::Result<()> {
/// let pool = ConnectionPool::builder("10.0.0.1:22122")
///     .max_connections(20)
///     .dial_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionPoolBuilder {
    addr: String,
    options: PoolOptions,
}

impl ConnectionPoolBuilder {
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            options: PoolOptions::default(),
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_size: usize) -> Self {
        self.options.max_size = max_size;
        self
    }

    #[must_use]
    pub fn dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.options.dial_timeout = dial_timeout;
        self
    }

    #[must_use]
    pub fn network_timeout(mut self, network_timeout: Duration) -> Self {
        self.options.network_timeout = network_timeout;
        self
    }

    #[must_use]
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.options.health_check_interval = interval;
        self
    }

    #[must_use]
    pub fn options(mut self, options: PoolOptions) -> Self {
        self.options = options;
        self
    }

    /// Dial the floor and start the health check task
    pub async fn build(self) -> Result<ConnectionPool> {
        ConnectionPool::create(self.addr, self.options).await
    }
}

/// Mutable pool state, only touched under [`PoolShared::state`]
#[derive(Debug)]
struct PoolState {
    idle: VecDeque<TcpStream>,
    /// Idle, checked out, under test, or reserved by an in-flight dial
    open: usize,
    /// Taken out of `idle` by the sweep for an active test
    under_test: usize,
    closed: bool,
}

/// State shared between the pool handle, its checked-out connections and
/// the health check task
#[derive(Debug)]
pub(crate) struct PoolShared {
    addr: String,
    max_size: usize,
    dial_timeout: Duration,
    network_timeout: Duration,
    state: Mutex<PoolState>,
    /// Signalled whenever a tested connection is settled
    test_settled: Notify,
    metrics: HealthCheckMetrics,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // No critical section can panic halfway through an update
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn network_timeout(&self) -> Duration {
        self.network_timeout
    }

    fn status(&self) -> PoolStatus {
        let state = self.lock();
        PoolStatus {
            available: AvailableConnections::new(state.idle.len()),
            open: OpenConnections::new(state.open),
            max_size: MaxPoolSize::new(self.max_size),
        }
    }

    /// Append a healthy connection to the idle tail, or close it if the pool
    /// is gone
    pub(crate) fn put_back(&self, stream: TcpStream) {
        let mut state = self.lock();
        if state.closed {
            state.open = state.open.saturating_sub(1);
            drop(state);
            drop(stream);
            debug!(pool = %self.addr, "Closed connection released after shutdown");
            return;
        }
        state.idle.push_back(stream);
        let available = state.idle.len();
        drop(state);
        debug!(pool = %self.addr, available, "Released connection");
    }

    /// Give up `n` slots whose connections are gone
    pub(crate) fn forget(&self, n: usize) {
        let mut state = self.lock();
        debug_assert!(state.open >= n, "pool count would go negative");
        state.open = state.open.saturating_sub(n);
    }

    /// Active-test the idle connections one at a time
    ///
    /// Only the connection under test is out of the idle list, so acquires
    /// keep being served from the rest. Survivors go to the idle tail and
    /// each connection is tested at most once per sweep.
    /// Returns `(checked, evicted)`.
    async fn sweep_idle(&self) -> (usize, usize) {
        let rounds = {
            let state = self.lock();
            if state.closed {
                return (0, 0);
            }
            state.idle.len()
        };

        let mut tested = HashSet::with_capacity(rounds);
        let mut checked = 0;
        let mut evicted = 0;
        for _ in 0..rounds {
            let Some(mut stream) = self.take_for_test(&tested) else {
                break;
            };
            if let Ok(local) = stream.local_addr() {
                tested.insert(local);
            }
            let healthy = match check_active_test(&mut stream, HEALTH_CHECK_TIMEOUT).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(pool = %self.addr, error = %e, "Evicting idle connection that failed active test");
                    false
                }
            };
            checked += 1;

            let mut state = self.lock();
            state.under_test -= 1;
            if healthy && !state.closed {
                state.idle.push_back(stream);
            } else {
                // Dead, or the pool was destroyed mid-test
                evicted += usize::from(!healthy);
                state.open = state.open.saturating_sub(1);
                drop(state);
                drop(stream);
            }
            self.test_settled.notify_waiters();
        }

        if checked > 0 {
            self.metrics.record_cycle(checked as u64, evicted as u64);
        }
        (checked, evicted)
    }

    /// Take the oldest idle connection out for an active test
    ///
    /// Returns `None` once the oldest one was already tested this sweep.
    fn take_for_test(&self, tested: &HashSet<SocketAddr>) -> Option<TcpStream> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let stream = state.idle.pop_front()?;
        if let Ok(local) = stream.local_addr()
            && tested.contains(&local)
        {
            state.idle.push_front(stream);
            return None;
        }
        state.under_test += 1;
        Some(stream)
    }
}

/// Connection pool for a single tracker or storage endpoint
#[derive(Debug)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConnectionPool {
    #[must_use]
    pub fn builder(addr: impl Into<String>) -> ConnectionPoolBuilder {
        ConnectionPoolBuilder::new(addr)
    }

    /// Create a pool with default timeouts and the given ceiling
    pub async fn new(addr: impl Into<String>, max_size: usize) -> Result<Self> {
        Self::builder(addr).max_connections(max_size).build().await
    }

    /// Create a pool from explicit options
    ///
    /// Fails with `Config` before dialing anything if the ceiling is below
    /// the floor. Any dial failure while filling the floor fails the whole
    /// pool; connections already dialed are closed.
    pub async fn create(addr: impl Into<String>, options: PoolOptions) -> Result<Self> {
        let addr = addr.into();
        options.validate()?;

        let mut idle = VecDeque::with_capacity(options.max_size);
        for _ in 0..options.min_size {
            idle.push_back(dial::connect(&addr, options.dial_timeout).await?);
        }
        let open = idle.len();

        let shared = Arc::new(PoolShared {
            addr,
            max_size: options.max_size,
            dial_timeout: options.dial_timeout,
            network_timeout: options.network_timeout,
            state: Mutex::new(PoolState {
                idle,
                open,
                under_test: 0,
                closed: false,
            }),
            test_settled: Notify::new(),
            metrics: HealthCheckMetrics::new(),
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(run_periodic_health_checks(
            Arc::clone(&shared),
            options.health_check_interval,
            shutdown_rx,
        ));

        info!(
            pool = %shared.addr,
            min_size = options.min_size,
            max_size = options.max_size,
            "Created connection pool"
        );

        Ok(Self {
            shared,
            shutdown_tx,
        })
    }

    /// Address this pool connects to
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.shared.addr
    }

    /// Check out a connection
    ///
    /// Reuses the oldest idle connection if there is one, otherwise dials a
    /// new one while below the ceiling. At the ceiling it waits only for a
    /// connection under an active test to come back; with none under test it
    /// fails at once with `PoolExhausted` and never waits for a release.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        loop {
            // Registered before the state check so a settle in between is seen
            let test_settled = self.shared.test_settled.notified();
            {
                let mut state = self.shared.lock();
                if state.closed {
                    return Err(ClientError::PoolClosed {
                        addr: self.shared.addr.clone(),
                    });
                }
                if let Some(stream) = state.idle.pop_front() {
                    drop(state);
                    debug!(pool = %self.shared.addr, "Reusing idle connection");
                    return Ok(PooledConnection::new(stream, Arc::clone(&self.shared)));
                }
                if state.open < self.shared.max_size {
                    // Reserve the slot so concurrent misses cannot overshoot
                    state.open += 1;
                    break;
                }
                if state.under_test == 0 {
                    return Err(ClientError::PoolExhausted {
                        addr: self.shared.addr.clone(),
                        max_size: self.shared.max_size,
                    });
                }
            }
            debug!(pool = %self.shared.addr, "Waiting for a connection under active test");
            test_settled.await;
        }

        match dial::connect(&self.shared.addr, self.shared.dial_timeout).await {
            Ok(stream) => {
                debug!(pool = %self.shared.addr, "Grew pool with new connection");
                Ok(PooledConnection::new(stream, Arc::clone(&self.shared)))
            }
            Err(e) => {
                self.shared.forget(1);
                Err(e)
            }
        }
    }

    /// Return a connection to the idle list
    ///
    /// Same as [`PooledConnection::release`].
    pub fn release(&self, conn: PooledConnection) {
        conn.release();
    }

    /// Current idle/open/ceiling counters
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.shared.status()
    }

    #[must_use]
    pub fn health_check_metrics(&self) -> &HealthCheckMetrics {
        &self.shared.metrics
    }

    /// Run one liveness sweep now instead of waiting for the next tick
    ///
    /// Returns `(checked, evicted)`.
    pub async fn check_idle_connections(&self) -> (usize, usize) {
        self.shared.sweep_idle().await
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Stop the health check task, close idle connections and refuse new
    /// acquires
    ///
    /// Checked-out connections stay usable; they are closed when released.
    /// Calling this more than once is harmless.
    pub fn destroy(&self) {
        // No receiver left is fine: the task may already have stopped
        let _ = self.shutdown_tx.send(());

        let idle = {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle = std::mem::take(&mut state.idle);
            state.open = state.open.saturating_sub(idle.len());
            idle
        };
        let closed = idle.len();
        drop(idle);
        self.shared.test_settled.notify_waiters();

        info!(pool = %self.shared.addr, closed, "Destroyed connection pool");
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn run_periodic_health_checks(
    shared: Arc<PoolShared>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            // A send or a dropped sender both end the loop
            _ = shutdown_rx.recv() => {
                debug!(pool = %shared.addr, "Health check task shutting down");
                break;
            }
        }

        let (checked, evicted) = shared.sweep_idle().await;
        if evicted > 0 {
            let status = shared.status();
            info!(
                pool = %shared.addr,
                checked,
                evicted,
                open = %status.open,
                "Health check evicted dead connections"
            );
        } else if checked > 0 {
            debug!(pool = %shared.addr, checked, "Health check passed");
        }
    }
}
