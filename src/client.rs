//! High-level client over the pool registry
//!
//! Every operation is two phases: ask a tracker where to go, then run the
//! request on that storage node. Connections are settled after each phase;
//! a failed tracker phase never touches storage. Nothing is retried.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tracing::{Level, debug, error, warn};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::pool::PoolRegistry;
use crate::protocol::{StorageTarget, TrackerQuery, storage};
use crate::task::{
    self, DeleteTask, DownloadSink, DownloadTask, Task, TrackerQueryTask, UploadSource, UploadTask,
};
use crate::types::FileId;

/// Client for a tracker/storage cluster
///
/// Cheap to share: clone the [`Arc`] around it or build several clients over
/// one registry with [`Client::from_registry`].
#[derive(Debug)]
pub struct Client {
    registry: Arc<PoolRegistry>,
}

impl Client {
    /// Validate `config` and create one pool per tracker
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let registry = PoolRegistry::from_config(&config).await?;
        Ok(Self::from_registry(Arc::new(registry)))
    }

    #[must_use]
    pub fn from_registry(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Ask a tracker for a node to upload to
    pub async fn query_store_target(&self) -> Result<StorageTarget> {
        self.query_tracker(TrackerQuery::Store).await
    }

    /// Ask a tracker for a node holding `file_id`
    pub async fn query_fetch_target(&self, file_id: &FileId) -> Result<StorageTarget> {
        self.query_tracker(TrackerQuery::Fetch(file_id.clone()))
            .await
    }

    async fn query_tracker(&self, query: TrackerQuery) -> Result<StorageTarget> {
        let conn = self.registry.acquire_tracker_connection().await?;
        let tracker = conn.addr().to_string();

        let target = task::execute(&mut TrackerQueryTask::new(query), conn).await?;
        debug!(
            tracker = %tracker,
            storage = %target.addr,
            group = %target.group,
            store_path_index = target.store_path_index,
            "Tracker resolved storage target"
        );
        Ok(target)
    }

    async fn run_on_storage<T: Task>(
        &self,
        target: &StorageTarget,
        task: &mut T,
    ) -> Result<T::Output> {
        let conn = self
            .registry
            .acquire_storage_connection(&target.addr)
            .await?;
        task::execute(task, conn).await
    }

    async fn upload(&self, source: UploadSource<'_>, ext_name: &str) -> Result<FileId> {
        if source.is_empty() {
            return Err(ClientError::EmptyUpload);
        }
        let target = self.query_store_target().await?;
        let mut task = UploadTask::new(target.store_path_index, ext_name, source)?;
        self.run_on_storage(&target, &mut task).await
    }

    /// Upload bytes from memory; `ext_name` is cut to 6 bytes
    pub async fn upload_buffer(&self, data: &[u8], ext_name: &str) -> Result<FileId> {
        logged(
            "upload",
            self.upload(UploadSource::Buffer(data), ext_name).await,
        )
    }

    /// Upload a local file, streaming it from disk
    ///
    /// The extension is taken from the file name.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<FileId> {
        let path = path.as_ref();
        let result: Result<FileId> = async {
            let file = File::open(path).await.map_err(local_file(path))?;
            let size = file.metadata().await.map_err(local_file(path))?.len();
            let ext_name = storage::ext_name_from_path(path);
            self.upload(UploadSource::File { file, size, path }, ext_name)
                .await
        }
        .await;
        logged("upload", result)
    }

    /// Download `length` bytes from `offset` into memory (0 = to the end)
    pub async fn download_to_buffer(
        &self,
        file_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        let result: Result<Vec<u8>> = async {
            let file_id = FileId::parse(file_id)?;
            let target = self.query_fetch_target(&file_id).await?;
            let mut buf = Vec::new();
            let mut task =
                DownloadTask::new(&file_id, offset, length, DownloadSink::Buffer(&mut buf));
            self.run_on_storage(&target, &mut task).await?;
            Ok(buf)
        }
        .await;
        logged("download", result)
    }

    /// Download up to `buf.len()` bytes from `offset` into `buf`
    ///
    /// Returns the number of bytes written to the front of `buf`.
    pub async fn download_into(&self, file_id: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        let result: Result<usize> = async {
            let file_id = FileId::parse(file_id)?;
            if buf.is_empty() {
                return Ok(0);
            }
            let target = self.query_fetch_target(&file_id).await?;
            let length = buf.len() as u64;
            let mut task = DownloadTask::new(&file_id, offset, length, DownloadSink::Slice(buf));
            let received = self.run_on_storage(&target, &mut task).await?;
            Ok(received as usize)
        }
        .await;
        logged("download", result)
    }

    /// Download into a local file
    ///
    /// The file is created or truncated only after the storage node accepted
    /// the request, so a failed lookup leaves an existing file untouched.
    /// Returns the number of bytes written.
    pub async fn download_to_file(
        &self,
        file_id: &str,
        path: impl AsRef<Path>,
        offset: u64,
        length: u64,
    ) -> Result<u64> {
        let path = path.as_ref();
        let result: Result<u64> = async {
            let file_id = FileId::parse(file_id)?;
            let target = self.query_fetch_target(&file_id).await?;
            let mut task = DownloadTask::new(&file_id, offset, length, DownloadSink::File(path));
            self.run_on_storage(&target, &mut task).await
        }
        .await;
        logged("download", result)
    }

    /// Delete a stored file
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let result: Result<()> = async {
            let file_id = FileId::parse(file_id)?;
            let target = self.query_fetch_target(&file_id).await?;
            self.run_on_storage(&target, &mut DeleteTask::new(&file_id))
                .await
        }
        .await;
        logged("delete", result)
    }

    /// Destroy every tracker and storage pool
    pub async fn close(&self) {
        self.registry.close().await;
    }
}

fn local_file(path: &Path) -> impl FnOnce(io::Error) -> ClientError + '_ {
    move |source| ClientError::LocalFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Log a failed operation at the level its error calls for
fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        let level = e.log_level();
        if level == Level::ERROR {
            error!(operation, error = %e, "Operation failed");
        } else if level == Level::WARN {
            warn!(operation, error = %e, "Operation failed");
        } else {
            debug!(operation, error = %e, "Operation failed");
        }
    }
    result
}
