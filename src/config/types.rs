//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults;
use crate::constants::pool::MIN_CONNECTIONS;
use crate::pool::PoolOptions;
use crate::types::duration_serde;

/// Client configuration
///
/// # Examples
///
/// ```toml
/// tracker_addrs = ["10.0.0.1:22122", "10.0.0.2:22122"]
/// max_connections = 20
/// dial_timeout = 5
/// network_timeout = 30
/// health_check_interval = 20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Tracker endpoints as `host:port`, tried in this order
    pub tracker_addrs: Vec<String>,
    /// Ceiling for every tracker and storage pool (at least 5)
    #[serde(default = "defaults::max_connections")]
    pub max_connections: usize,
    /// TCP connect timeout in seconds
    #[serde(with = "duration_serde", default = "defaults::dial_timeout")]
    pub dial_timeout: Duration,
    /// Bound on each frame read or write, in seconds
    #[serde(with = "duration_serde", default = "defaults::network_timeout")]
    pub network_timeout: Duration,
    /// Seconds between liveness sweeps of idle connections
    #[serde(with = "duration_serde", default = "defaults::health_check_interval")]
    pub health_check_interval: Duration,
}

impl Config {
    /// Configuration with default pool settings for the given trackers
    #[must_use]
    pub fn new(tracker_addrs: Vec<String>) -> Self {
        Self {
            tracker_addrs,
            max_connections: defaults::max_connections(),
            dial_timeout: defaults::dial_timeout(),
            network_timeout: defaults::network_timeout(),
            health_check_interval: defaults::health_check_interval(),
        }
    }

    /// Pool settings derived from this configuration
    #[must_use]
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.max_connections,
            min_size: MIN_CONNECTIONS,
            dial_timeout: self.dial_timeout,
            network_timeout: self.network_timeout,
            health_check_interval: self.health_check_interval,
        }
    }
}
