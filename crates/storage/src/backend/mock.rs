//! In-memory storage backend for testing.

use super::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use time::OffsetDateTime;

use crate::StorageBackend;

type Files = Arc<RwLock<HashMap<PathBuf, (OffsetDateTime, Vec<u8>)>>>;

/// In-memory storage backend for testing.
///
/// Files are kept in a `HashMap` behind a (synchronous) [`RwLock`] that is
/// never held across an await point, so streaming writers can commit from
/// inside blocking tasks. Paths registered with
/// [`fail_reads_of`](Self::fail_reads_of) report a network error on read,
/// [`fail_writes_of`](Self::fail_writes_of) simulates a disk filling up
/// part-way through a streamed write, and [`offline`](Self::offline) makes
/// every operation fail the way an unreachable remote would.
///
/// ```
/// use logstat_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("site-2024-01-01.log.gz", b"\x1f\x8b..."),
/// ]);
/// assert!(backend.exists(Path::new("site-2024-01-01.log.gz")).await?);
///
/// backend.write(Path::new("site-2024-01-02.log.gz"), b"data...").await?;
/// assert!(backend.exists(Path::new("site-2024-01-02.log.gz")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: Files,
    failing_reads: HashSet<PathBuf>,
    failing_writes: HashMap<PathBuf, usize>,
    offline: bool,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: Arc::new(RwLock::new(map)),
            failing_reads: HashSet::new(),
            failing_writes: HashMap::new(),
            offline: false,
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make reads of `path` fail with a network error.
    pub fn fail_reads_of(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_reads.insert(path.into());
        self
    }

    /// Make streamed writes to `path` fail once `limit` bytes are stored.
    ///
    /// The bytes that fit are committed before the error, leaving a
    /// truncated file behind like a full disk would.
    pub fn fail_writes_of(mut self, path: impl Into<PathBuf>, limit: usize) -> Self {
        self.failing_writes.insert(path.into(), limit);
        self
    }

    /// Make every operation fail with a network error.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            exn::bail!(ErrorKind::Network(format!("{} is unreachable", self.name)));
        }
        Ok(())
    }

    fn check_readable(&self, path: &Path) -> Result<()> {
        self.check_online()?;
        if self.failing_reads.contains(path) {
            exn::bail!(ErrorKind::Network(format!("connection reset while reading {}", path.display())));
        }
        Ok(())
    }

    fn get(&self, path: &Path) -> Result<Vec<u8>> {
        let guard = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        let (_inserted, data) = guard.get(path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?;
        Ok(data.clone())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

/// Buffers writes and commits them to the mock store on every flush.
struct MockWriter {
    path: PathBuf,
    storage: Files,
    buffer: Vec<u8>,
    limit: Option<usize>,
}
impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(limit) = self.limit
            && self.buffer.len() + buf.len() > limit
        {
            let room = limit.saturating_sub(self.buffer.len());
            self.buffer.extend_from_slice(&buf[..room]);
            self.flush()?;
            return Err(std::io::Error::other("no space left on device"));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut guard = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(self.path.clone(), (OffsetDateTime::now_utc(), self.buffer.clone()));
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self) -> FileInfoStream<'a> {
        Box::pin(stream! {
            if let Err(e) = self.check_online() {
                yield Err(e);
                return;
            }
            // Snapshot under the lock, then release it before yielding.
            let entries: Vec<(PathBuf, OffsetDateTime, u64)> = {
                let guard = self.storage.read().unwrap_or_else(PoisonError::into_inner);
                guard
                    .iter()
                    .filter(|(path, _)| path.components().count() == 1)
                    .map(|(path, (inserted, data))| (path.clone(), *inserted, data.len() as u64))
                    .collect()
            };
            for (path, inserted, size) in entries {
                yield Ok(FileInfo::new(path, size, inserted));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.check_online()?;
        let path = validate_path(path)?;
        Ok(self.storage.read().unwrap_or_else(PoisonError::into_inner).contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        self.check_readable(&path)?;
        self.get(&path)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.check_online()?;
        let path = validate_path(path)?;
        let mut guard = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(path, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let path = validate_path(path)?;
        self.check_readable(&path)?;
        Ok(Box::new(Cursor::new(self.get(&path)?)))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        self.check_online()?;
        let path = validate_path(path)?;
        Ok(Box::new(MockWriter {
            limit: self.failing_writes.get(&path).copied(),
            path,
            storage: Arc::clone(&self.storage),
            buffer: Vec::new(),
        }))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.check_online()?;
        let path = validate_path(path)?;
        let mut guard = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}
