//! Core types shared by the pool, protocol and client layers

pub mod duration;
pub mod pool;
pub mod validated;

pub use duration::duration_serde;
pub use pool::{AvailableConnections, InUseConnections, MaxPoolSize, OpenConnections};
pub use validated::{FileId, GroupName, RemoteFilename, ValidationError};
