//! Error types for the storage client
//!
//! Every failure surfaced by the pool, the frame codec and the task executor
//! is one of these variants. The split that matters operationally is
//! [`ClientError::is_transport`]: a transport failure leaves the connection
//! in an unknown state, so it is closed instead of being returned to its pool.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ValidationError;

/// Result alias used across the crate
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors that can occur while talking to trackers and storage nodes
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Invalid configuration, e.g. a pool ceiling below the floor
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// TCP connection could not be established
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connection was not established within the dial timeout
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// I/O error on an established connection (reset, short read, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read or write did not complete within the network timeout
    #[error("timed out during {operation}")]
    Timeout { operation: &'static str },

    /// Peer sent bytes that do not form a valid frame or body
    #[error("malformed response: {reason}")]
    Malformed { reason: String },

    /// Complete response frame whose body does not decode
    ///
    /// The body was read in full, so the connection is still aligned.
    #[error("invalid response body: {reason}")]
    InvalidResponse { reason: String },

    /// Well-formed response whose status byte signals failure
    #[error("server returned status {status} for command {command}")]
    ProtocolStatus { command: u8, status: u8 },

    /// Pool ceiling reached and no idle connection available
    #[error("connection pool for {addr} exhausted (max size: {max_size})")]
    PoolExhausted { addr: String, max_size: usize },

    /// No tracker pool could hand out a connection
    #[error("no tracker pool available ({tried} tried){}", last_error_suffix(.last_error))]
    NoAvailablePool {
        tried: usize,
        last_error: Option<Box<ClientError>>,
    },

    /// Pool has been destroyed and accepts no new operations
    #[error("connection pool for {addr} is closed")]
    PoolClosed { addr: String },

    /// File id is not of the form `group/remote_filename`
    #[error("invalid file id: {0}")]
    InvalidFileId(#[from] ValidationError),

    /// Local file could not be opened, read or written
    #[error("local file {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Uploads of zero bytes are rejected before contacting the cluster
    #[error("refusing to upload an empty file")]
    EmptyUpload,

    /// Caller-supplied buffer cannot hold the downloaded content
    #[error("download needs {needed} bytes but the buffer holds {capacity}")]
    BufferTooSmall { needed: u64, capacity: usize },
}

fn last_error_suffix(last_error: &Option<Box<ClientError>>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

impl ClientError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Check if this error leaves the connection unusable
    ///
    /// Covers dial failures, I/O errors, timeouts and malformed frames.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::ConnectTimeout { .. }
                | Self::Io(_)
                | Self::Timeout { .. }
                | Self::Malformed { .. }
        )
    }

    /// Check if the server rejected the request with a non-zero status
    #[must_use]
    pub const fn is_protocol_status(&self) -> bool {
        matches!(self, Self::ProtocolStatus { .. })
    }

    /// Status byte returned by the server, if this is a protocol status error
    #[must_use]
    pub const fn status(&self) -> Option<u8> {
        match self {
            Self::ProtocolStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            // Misconfiguration needs attention
            Self::Config { .. } | Self::NoAvailablePool { .. } => tracing::Level::ERROR,
            // Server-side rejections (e.g. file not found) are routine
            Self::ProtocolStatus { .. }
            | Self::InvalidFileId(_)
            | Self::EmptyUpload
            | Self::BufferTooSmall { .. } => tracing::Level::DEBUG,
            _ => tracing::Level::WARN,
        }
    }
}
