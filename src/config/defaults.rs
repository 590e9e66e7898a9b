//! Default values for configuration fields
//!
//! This module centralizes all default value functions used in serde deserialization.

use std::time::Duration;

use crate::constants::{pool, timeout};

/// Default maximum connections per endpoint pool
#[inline]
pub fn max_connections() -> usize {
    pool::DEFAULT_MAX_CONNECTIONS
}

/// Default TCP connect timeout
#[inline]
pub fn dial_timeout() -> Duration {
    timeout::DIAL
}

/// Default bound on a single frame read or write
#[inline]
pub fn network_timeout() -> Duration {
    timeout::NETWORK
}

/// Default interval between idle connection sweeps
#[inline]
pub fn health_check_interval() -> Duration {
    pool::HEALTH_CHECK_INTERVAL
}
