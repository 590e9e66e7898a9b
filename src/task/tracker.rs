use async_trait::async_trait;

use super::Task;
use crate::error::Result;
use crate::pool::PooledConnection;
use crate::protocol::{StorageTarget, TrackerQuery};

/// Ask a tracker which storage node to use
#[derive(Debug, Clone)]
pub struct TrackerQueryTask {
    query: TrackerQuery,
}

impl TrackerQueryTask {
    #[must_use]
    pub fn new(query: TrackerQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl Task for TrackerQueryTask {
    type Output = StorageTarget;

    async fn send_request(&mut self, conn: &mut PooledConnection) -> Result<()> {
        conn.send_frame(self.query.command(), &self.query.encode_body())
            .await
    }

    async fn recv_response(&mut self, conn: &mut PooledConnection) -> Result<StorageTarget> {
        let frame = conn.recv_frame().await?;
        self.query.decode_response(&frame.body)
    }
}
