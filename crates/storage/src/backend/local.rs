//! Local filesystem storage backend.
//!
//! Files live directly inside a configured directory and are accessed with
//! `tokio::fs` for async I/O. Streaming handles are plain [`std::fs::File`]s
//! so they can be moved into blocking tasks.

use crate::backend::{BoxSyncRead, BoxSyncWrite, FileInfoStream};
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem storage backend.
///
/// ```no_run
/// use logstat_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/var/lib/logstat/logstash")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is relative
    /// or exists but is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Only happens once per run, not worth making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::new(path, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Keeps the `?` operator usable for each directory entry; inside the
    /// `stream!` loop errors have to be yielded instead.
    async fn process_entry(&self, entry: DirEntry) -> Result<Option<FileInfo>> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if !metadata.is_file() {
            // Subdirectories and (most likely broken) symlinks.
            return Ok(None);
        }
        let relative = path.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", path.display(), self.root.display()))
        })?;
        Ok(Some(Self::metadata(&validate_path(relative)?, metadata)?))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self) -> FileInfoStream<'a> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    return;
                },
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &self.root))); continue; },
                };
                match self.process_entry(entry).await {
                    Ok(Some(info)) => yield Ok(info),
                    Ok(None) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(std::io::BufReader::new(file.into_std().await)))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let file = fs::File::create(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(std::io::BufWriter::new(file.into_std().await)))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logstat_compress::Compression;
    use std::io::{Read, Write};

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("local", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("local", "relative/path").is_err());
        let file = temp_dir.path().join("file.log");
        std::fs::write(&file, b"x").unwrap();
        assert!(LocalBackend::new("local", &file).is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("logstash");
        LocalBackend::new("local", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_absolute_path() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("site-2024-01-01.log");
        assert_eq!(backend.absolute_path("site-2024-01-01.log").unwrap(), expected);
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("site.log"), b"Hello, world!").await.unwrap();
        assert_eq!(backend.read(Path::new("site.log")).await.unwrap(), b"Hello, world!");
    }

    #[tokio::test]
    async fn test_streaming_reader_and_writer() {
        let (_temp_dir, backend) = backend();
        let mut writer = backend.writer(Path::new("site.log")).await.unwrap();
        writer.write_all(b"streamed").unwrap();
        writer.flush().unwrap();
        drop(writer);
        let mut reader = backend.reader(Path::new("site.log")).await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"streamed");
    }

    #[tokio::test]
    async fn test_reader_not_found() {
        let (_temp_dir, backend) = backend();
        let err = backend.reader(Path::new("missing.log")).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (_temp_dir, backend) = backend();
        assert!(!backend.exists(Path::new("site.log")).await.unwrap());
        backend.write(Path::new("site.log"), b"data").await.unwrap();
        assert!(backend.exists(Path::new("site.log")).await.unwrap());
        backend.delete(Path::new("site.log")).await.unwrap();
        assert!(!backend.exists(Path::new("site.log")).await.unwrap());
        let err = backend.delete(Path::new("site.log")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_is_flat() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("site-2024-01-01.log"), b"data").await.unwrap();
        backend.write(Path::new("site-2024-01-02.log.gz"), b"data").await.unwrap();
        backend.write(Path::new("nested/site-2024-01-03.log"), b"data").await.unwrap();
        std::fs::create_dir(temp_dir.path().join("empty")).unwrap();
        let mut files = backend.list().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("site-2024-01-01.log"), PathBuf::from("site-2024-01-02.log.gz")]);
        assert_eq!(files[0].compression, Compression::None);
        assert_eq!(files[1].compression, Compression::Gzip);
        assert_eq!(files[1].size, 4);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_temp_dir, backend) = backend();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../etc/passwd"), b"data").await.is_err());
        assert!(backend.delete(Path::new("../../file")).await.is_err());
    }
}
