//! Storage backend trait and implementations.
//!
//! This module defines the [`StorageBackend`] trait, which provides a unified
//! interface over a flat directory of log files, wherever that directory
//! lives (local filesystem, SFTP server, memory).

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "sftp")]
mod sftp;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "sftp")]
pub use self::sftp::{SftpBackend, SftpCredentials};
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::{Read, Write};
use std::path::Path;
use std::pin::Pin;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;
pub type BoxSyncWrite = Box<dyn Write + Send + 'static>;

/// Unified interface for log stores.
///
/// All paths are relative to the store root and are validated with
/// [`validate_path`](crate::validate_path) by every implementation before
/// use.
///
/// # Streaming
/// Move a remote archive into a local store and inflate it, without
/// buffering either file in memory:
///
/// ```
/// use std::path::Path;
/// use logstat_compress::Compression;
/// use logstat_storage::backend::StorageBackend;
/// use logstat_storage::error::{ErrorKind, Result};
///
/// async fn pull(remote: &dyn StorageBackend, local: &dyn StorageBackend, name: &str) -> Result<u64> {
///     let source = remote.reader(Path::new(name)).await?;
///     let target = local.writer(Path::new(name.trim_end_matches(".gz"))).await?;
///     tokio::task::spawn_blocking(move || {
///         Compression::Gzip
///             .decompress_stream(source, target)
///             .map_err(|e| e.raise(ErrorKind::BackendError("inflate failed".to_string())))
///     })
///     .await
///     .map_err(|e| exn::Exn::from(ErrorKind::BackendError(e.to_string())))?
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List every file in the store root.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream file metadata for every regular file directly inside the store
    /// root. Subdirectories are not descended into and ordering is
    /// unspecified.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use logstat_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream();
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or truncating the file.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Open a file for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). Opening happens
    /// before returning, so [`NotFound`](crate::error::ErrorKind::NotFound)
    /// surfaces here rather than on first read.
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Open a file for streaming writes, creating or truncating it.
    ///
    /// Callers must call `flush()` before dropping; some backends only
    /// commit data on flush.
    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;
}
