//! Request/response exchanges run over a pooled connection
//!
//! A [`Task`] knows how to write one request and read its reply. [`execute`]
//! runs it on a checked-out connection and settles the connection on every
//! exit path: transport failures discard it, anything else returns it to
//! its pool.

mod delete;
mod download;
mod tracker;
mod upload;

pub use delete::DeleteTask;
pub use download::{DownloadSink, DownloadTask};
pub use tracker::TrackerQueryTask;
pub use upload::{UploadSource, UploadTask};

use async_trait::async_trait;

use crate::error::Result;
use crate::pool::PooledConnection;

/// One request/response exchange
#[async_trait]
pub trait Task: Send {
    type Output: Send;

    /// Write the request frame
    async fn send_request(&mut self, conn: &mut PooledConnection) -> Result<()>;

    /// Read and decode the reply frame
    async fn recv_response(&mut self, conn: &mut PooledConnection) -> Result<Self::Output>;
}

/// Run `task` on `conn`, then release or discard the connection
pub async fn execute<T>(task: &mut T, mut conn: PooledConnection) -> Result<T::Output>
where
    T: Task + ?Sized,
{
    let outcome = exchange(task, &mut conn).await;
    conn.settle(&outcome);
    outcome
}

async fn exchange<T>(task: &mut T, conn: &mut PooledConnection) -> Result<T::Output>
where
    T: Task + ?Sized,
{
    task.send_request(conn).await?;
    task.recv_response(conn).await
}
