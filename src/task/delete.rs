use async_trait::async_trait;

use super::Task;
use crate::error::Result;
use crate::pool::PooledConnection;
use crate::protocol::{codes, storage};
use crate::types::FileId;

/// Remove a file from the storage node holding it
#[derive(Debug)]
pub struct DeleteTask<'a> {
    file_id: &'a FileId,
}

impl<'a> DeleteTask<'a> {
    #[must_use]
    pub fn new(file_id: &'a FileId) -> Self {
        Self { file_id }
    }
}

#[async_trait]
impl<'a> Task for DeleteTask<'a> {
    type Output = ();

    async fn send_request(&mut self, conn: &mut PooledConnection) -> Result<()> {
        conn.send_frame(codes::DELETE_FILE, &storage::encode_delete_request(self.file_id))
            .await
    }

    async fn recv_response(&mut self, conn: &mut PooledConnection) -> Result<()> {
        // Success carries no body; anything present is read and ignored
        conn.recv_frame().await?;
        Ok(())
    }
}
