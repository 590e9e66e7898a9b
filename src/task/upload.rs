use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;

use super::Task;
use crate::error::{ClientError, Result};
use crate::pool::PooledConnection;
use crate::protocol::{codes, storage};
use crate::types::FileId;

/// Where upload content comes from
#[derive(Debug)]
pub enum UploadSource<'a> {
    /// Bytes already in memory
    Buffer(&'a [u8]),
    /// An open local file of known size, streamed in chunks
    File {
        file: File,
        size: u64,
        path: &'a Path,
    },
}

impl UploadSource<'_> {
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Buffer(data) => data.len() as u64,
            Self::File { size, .. } => *size,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store new content on the node and path index a tracker picked
#[derive(Debug)]
pub struct UploadTask<'a> {
    store_path_index: u8,
    ext_name: String,
    source: UploadSource<'a>,
}

impl<'a> UploadTask<'a> {
    /// Fails with `EmptyUpload` for zero-length content
    pub fn new(store_path_index: u8, ext_name: &str, source: UploadSource<'a>) -> Result<Self> {
        if source.is_empty() {
            return Err(ClientError::EmptyUpload);
        }
        Ok(Self {
            store_path_index,
            ext_name: storage::truncate_ext_name(ext_name).to_string(),
            source,
        })
    }
}

#[async_trait]
impl<'a> Task for UploadTask<'a> {
    type Output = FileId;

    async fn send_request(&mut self, conn: &mut PooledConnection) -> Result<()> {
        let size = self.source.len();
        let prefix = storage::encode_upload_prefix(self.store_path_index, size, &self.ext_name);

        conn.send_header(codes::UPLOAD_FILE, prefix.len() as u64 + size)
            .await?;
        conn.send_body(&prefix).await?;
        match &mut self.source {
            UploadSource::Buffer(data) => {
                conn.send_body(*data).await?;
                conn.flush_body().await
            }
            UploadSource::File { file, size, path } => {
                conn.send_body_from(file, *size, *path).await
            }
        }
    }

    async fn recv_response(&mut self, conn: &mut PooledConnection) -> Result<FileId> {
        let frame = conn.recv_frame().await?;
        storage::decode_upload_response(&frame.body)
    }
}
