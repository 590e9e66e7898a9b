use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;

use super::Task;
use crate::constants::buffer::MAX_BUFFERED_BODY;
use crate::error::{ClientError, Result};
use crate::pool::PooledConnection;
use crate::protocol::{codes, storage};
use crate::types::FileId;

/// Where downloaded content goes
#[derive(Debug)]
pub enum DownloadSink<'a> {
    /// Resize a caller-owned vector to the size of the content
    Buffer(&'a mut Vec<u8>),
    /// Fill a caller-owned slice from the start
    Slice(&'a mut [u8]),
    /// Stream into a local file, created or truncated only once the storage
    /// node has accepted the request
    File(&'a Path),
}

/// Fetch a byte range of a stored file
///
/// `length` 0 means "to the end of the file".
#[derive(Debug)]
pub struct DownloadTask<'a> {
    file_id: &'a FileId,
    offset: u64,
    length: u64,
    sink: DownloadSink<'a>,
}

impl<'a> DownloadTask<'a> {
    #[must_use]
    pub fn new(file_id: &'a FileId, offset: u64, length: u64, sink: DownloadSink<'a>) -> Self {
        Self {
            file_id,
            offset,
            length,
            sink,
        }
    }
}

#[async_trait]
impl<'a> Task for DownloadTask<'a> {
    /// Number of content bytes received
    type Output = u64;

    async fn send_request(&mut self, conn: &mut PooledConnection) -> Result<()> {
        let body = storage::encode_download_request(self.file_id, self.offset, self.length);
        conn.send_frame(codes::DOWNLOAD_FILE, &body).await
    }

    async fn recv_response(&mut self, conn: &mut PooledConnection) -> Result<u64> {
        let header = conn.recv_header().await?;
        let len = header.body_len;

        match &mut self.sink {
            DownloadSink::Buffer(buf) => {
                if len > MAX_BUFFERED_BODY {
                    conn.mark_broken();
                    return Err(ClientError::malformed(format!(
                        "download of {len} bytes exceeds the {MAX_BUFFERED_BODY} byte buffer limit"
                    )));
                }
                buf.resize(len as usize, 0);
                conn.recv_exact(buf.as_mut_slice()).await?;
            }
            DownloadSink::Slice(buf) => {
                if len > buf.len() as u64 {
                    // Keep the connection aligned for the next caller
                    conn.drain(len).await?;
                    return Err(ClientError::BufferTooSmall {
                        needed: len,
                        capacity: buf.len(),
                    });
                }
                conn.recv_exact(&mut buf[..len as usize]).await?;
            }
            DownloadSink::File(path) => {
                let mut file = match File::create(*path).await {
                    Ok(file) => file,
                    Err(source) => {
                        // Keep the connection aligned for the next caller
                        conn.drain(len).await?;
                        return Err(ClientError::LocalFile {
                            path: path.to_path_buf(),
                            source,
                        });
                    }
                };
                conn.recv_body_into(&mut file, len, *path).await?;
            }
        }
        Ok(len)
    }
}
