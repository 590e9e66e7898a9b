//! Connection pooling for tracker and storage endpoints
//!
//! - [`ConnectionPool`]: bounded, health-checked connections to one address
//! - [`PooledConnection`]: a checked-out connection with frame helpers
//! - [`PoolRegistry`]: tracker pools fixed at startup plus storage pools
//!   created on first use

mod connection;
mod connection_pool;
pub mod dial;
pub mod health_check;
mod registry;

pub use connection::PooledConnection;
pub use connection_pool::{ConnectionPool, ConnectionPoolBuilder, PoolOptions};
pub use health_check::{HealthCheckError, HealthCheckMetrics};
pub use registry::PoolRegistry;

use crate::types::{AvailableConnections, InUseConnections, MaxPoolSize, OpenConnections};

/// Point-in-time counters of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle connections ready to be handed out
    pub available: AvailableConnections,
    /// Idle plus checked-out connections
    pub open: OpenConnections,
    /// Ceiling
    pub max_size: MaxPoolSize,
}

impl PoolStatus {
    /// Connections currently held by callers
    #[must_use]
    pub fn in_use(&self) -> InUseConnections {
        InUseConnections::from_pool_stats(self.open, self.available)
    }
}
