//! Liveness checks for idle pooled connections
//!
//! A connection is alive if it answers an `ACTIVE_TEST` frame with an empty
//! generic response and status 0 within [`HEALTH_CHECK_TIMEOUT`]. Anything
//! else evicts it.
//!
//! [`HEALTH_CHECK_TIMEOUT`]: crate::constants::pool::HEALTH_CHECK_TIMEOUT

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::protocol::{FrameHeader, HEADER_LEN, codes};

/// Errors that can occur during an active test
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// Failed to write the request
    #[error("Failed to write active test: {0}")]
    WriteError(std::io::Error),

    /// Failed to read the reply, including the peer closing the connection
    #[error("Failed to read active test response: {0}")]
    ReadError(std::io::Error),

    /// No reply within the health check timeout
    #[error("Active test timeout")]
    Timeout,

    /// Peer replied with something other than an empty, successful response
    #[error("Unexpected active test response: command {command}, status {status}, body {body_len} bytes")]
    UnexpectedResponse {
        command: u8,
        status: u8,
        body_len: u64,
    },
}

/// Send one `ACTIVE_TEST` and validate the reply
pub async fn check_active_test<S>(stream: &mut S, limit: Duration) -> Result<(), HealthCheckError>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let exchange = async {
        stream
            .write_all(&FrameHeader::request(codes::ACTIVE_TEST, 0).encode())
            .await
            .map_err(HealthCheckError::WriteError)?;

        let mut buf = [0u8; HEADER_LEN];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(HealthCheckError::ReadError)?;

        let header = FrameHeader::decode(&buf);
        if header.command != codes::RESP || header.status != 0 || header.body_len != 0 {
            return Err(HealthCheckError::UnexpectedResponse {
                command: header.command,
                status: header.status,
                body_len: header.body_len,
            });
        }
        Ok::<(), HealthCheckError>(())
    };

    timeout(limit, exchange)
        .await
        .map_err(|_| HealthCheckError::Timeout)?
}

/// Counters for periodic health checks (lock-free)
#[derive(Debug, Default)]
pub struct HealthCheckMetrics {
    cycles_run: AtomicU64,
    connections_checked: AtomicU64,
    connections_failed: AtomicU64,
}

impl HealthCheckMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sweep over the idle list
    pub fn record_cycle(&self, checked: u64, failed: u64) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.connections_checked
            .fetch_add(checked, Ordering::Relaxed);
        self.connections_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    pub fn connections_checked(&self) -> u64 {
        self.connections_checked.load(Ordering::Relaxed)
    }

    pub fn connections_failed(&self) -> u64 {
        self.connections_failed.load(Ordering::Relaxed)
    }

    /// Get the failure rate (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        let checked = self.connections_checked();
        if checked == 0 {
            0.0
        } else {
            self.connections_failed() as f64 / checked as f64
        }
    }
}
