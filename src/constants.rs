//! Constants used throughout the client
//!
//! This module centralizes magic numbers and wire-level sizes
//! to improve maintainability and reduce duplication.

use std::time::Duration;

/// Connection pool constants
pub mod pool {
    use super::Duration;

    /// Pool floor: connections dialed eagerly when a pool is created.
    /// Also the smallest ceiling a pool may be configured with.
    pub const MIN_CONNECTIONS: usize = 5;

    /// Default maximum connections per endpoint pool
    pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

    /// Interval between liveness sweeps of idle connections
    pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(20);

    /// How long a single active test may take before the connection is evicted
    pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Timeout constants
pub mod timeout {
    use super::Duration;

    /// Upper bound on establishing a TCP connection
    pub const DIAL: Duration = Duration::from_secs(10);

    /// Upper bound on any single frame read or write
    pub const NETWORK: Duration = Duration::from_secs(30);
}

/// Socket tuning constants
pub mod socket {
    use super::Duration;

    /// Idle time before the kernel starts sending keepalive probes
    pub const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

    /// Interval between keepalive probes
    pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
}

/// Buffer size constants
pub mod buffer {
    /// Largest response body that is read fully into memory (64MB).
    /// Bigger downloads have to be streamed to a file.
    pub const MAX_BUFFERED_BODY: u64 = 64 * 1024 * 1024;

    /// Chunk size used when draining or streaming bodies (64KB)
    pub const STREAM_CHUNK: usize = 64 * 1024;
}
