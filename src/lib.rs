//! # fdfs-client
//!
//! Async client for tracker/storage distributed file storage clusters.
//!
//! The interesting part is the connection layer: every tracker and storage
//! node gets a bounded [`ConnectionPool`] of health-checked TCP connections,
//! and every exchange is a 10-byte [`FrameHeader`] followed by a body.
//!
//! ```no_run
//! use fdfs_client::{Client, Config};
//!
//! # async fn example() -> fdfs_client::Result<()> {
//! let client = Client::new(Config::new(vec!["10.0.0.1:22122".to_string()])).await?;
//! let file_id = client.upload_buffer(b"hello", "txt").await?;
//! let data = client.download_to_buffer(&file_id.to_string(), 0, 0).await?;
//! assert_eq!(data, b"hello");
//! client.delete_file(&file_id.to_string()).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pool;
pub mod protocol;
pub mod task;
pub mod types;

pub use args::{Args, Command};
pub use client::Client;
pub use config::{Config, load_config};
pub use error::{ClientError, Result};
pub use logging::init_logging;
pub use pool::{
    ConnectionPool, HealthCheckMetrics, PoolOptions, PoolRegistry, PoolStatus, PooledConnection,
};
pub use protocol::{Frame, FrameHeader, StorageTarget};
pub use types::FileId;
