//! Address to pool mapping for trackers and storage nodes

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ConnectionPool, PoolOptions, PooledConnection, PoolStatus};
use crate::config::Config;
use crate::error::{ClientError, Result};

/// Owns every pool a client uses
///
/// Tracker pools are created up front from configuration and never change.
/// Storage pools are created the first time a tracker points at a new
/// address; the map lock is held across creation so concurrent lookups of
/// the same address end up sharing one pool.
#[derive(Debug)]
pub struct PoolRegistry {
    trackers: Vec<Arc<ConnectionPool>>,
    storages: Mutex<HashMap<String, Arc<ConnectionPool>>>,
    options: PoolOptions,
    closed: AtomicBool,
}

impl PoolRegistry {
    /// Create one pool per tracker address
    ///
    /// Fails if any tracker pool cannot fill its floor; pools created before
    /// the failure are torn down.
    pub async fn new(tracker_addrs: &[String], options: PoolOptions) -> Result<Self> {
        if tracker_addrs.is_empty() {
            return Err(ClientError::config("at least one tracker address is required"));
        }

        let mut trackers = Vec::with_capacity(tracker_addrs.len());
        for addr in tracker_addrs {
            trackers.push(Arc::new(ConnectionPool::create(addr.as_str(), options.clone()).await?));
        }

        info!(trackers = trackers.len(), max_size = options.max_size, "Pool registry ready");

        Ok(Self {
            trackers,
            storages: Mutex::new(HashMap::new()),
            options,
            closed: AtomicBool::new(false),
        })
    }

    /// Build tracker pools from a validated [`Config`]
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.tracker_addrs, config.pool_options()).await
    }

    /// Options applied to every pool this registry creates
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    #[must_use]
    pub fn tracker_pools(&self) -> &[Arc<ConnectionPool>] {
        &self.trackers
    }

    fn ensure_open(&self, addr: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::PoolClosed {
                addr: addr.to_string(),
            });
        }
        Ok(())
    }

    /// Check out a connection from the first tracker pool that can supply one
    ///
    /// Trackers are tried in configuration order. Fails with
    /// `NoAvailablePool` carrying the last pool's error when every pool is
    /// exhausted or unreachable.
    pub async fn acquire_tracker_connection(&self) -> Result<PooledConnection> {
        let mut last_error = None;
        for pool in &self.trackers {
            match pool.acquire().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!(tracker = %pool.addr(), error = %e, "Tracker pool unavailable, trying next");
                    last_error = Some(Box::new(e));
                }
            }
        }
        Err(ClientError::NoAvailablePool {
            tried: self.trackers.len(),
            last_error,
        })
    }

    /// Look up the pool for `addr`, creating it on first use
    ///
    /// A failed creation registers nothing; the next call tries again.
    pub async fn storage_pool(&self, addr: &str) -> Result<Arc<ConnectionPool>> {
        let mut pools = self.storages.lock().await;
        // Checked under the map lock so a concurrent close cannot miss a
        // pool created here
        self.ensure_open(addr)?;
        if let Some(pool) = pools.get(addr) {
            return Ok(Arc::clone(pool));
        }

        debug!(storage = %addr, "Creating pool for newly discovered storage node");
        let pool = Arc::new(ConnectionPool::create(addr, self.options.clone()).await?);
        pools.insert(addr.to_string(), Arc::clone(&pool));
        Ok(pool)
    }

    /// Check out a connection to the storage node at `addr`
    pub async fn acquire_storage_connection(&self, addr: &str) -> Result<PooledConnection> {
        self.storage_pool(addr).await?.acquire().await
    }

    pub async fn storage_pool_count(&self) -> usize {
        self.storages.lock().await.len()
    }

    pub async fn has_storage_pool(&self, addr: &str) -> bool {
        self.storages.lock().await.contains_key(addr)
    }

    /// Status of every pool, trackers first
    pub async fn status(&self) -> Vec<(String, PoolStatus)> {
        let mut all: Vec<(String, PoolStatus)> = self
            .trackers
            .iter()
            .map(|pool| (pool.addr().to_string(), pool.status()))
            .collect();

        let storages = self.storages.lock().await;
        let mut storage_status: Vec<_> = storages
            .iter()
            .map(|(addr, pool)| (addr.clone(), pool.status()))
            .collect();
        storage_status.sort_by(|a, b| a.0.cmp(&b.0));
        all.extend(storage_status);
        all
    }

    /// Destroy every tracker and storage pool
    ///
    /// Further acquires fail with `PoolClosed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for pool in &self.trackers {
            pool.destroy();
        }
        let storages = std::mem::take(&mut *self.storages.lock().await);
        for pool in storages.values() {
            pool.destroy();
        }
        info!(
            trackers = self.trackers.len(),
            storages = storages.len(),
            "Closed pool registry"
        );
    }
}
