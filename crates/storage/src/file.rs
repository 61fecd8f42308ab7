//! Listing metadata shared by every backend.

use logstat_compress::Compression;
use std::path::PathBuf;
use time::OffsetDateTime;

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
    /// Detected compression format from file extension
    pub compression: Compression,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        let path = path.into();
        let compression = Compression::from_path(&path);
        Self {
            path,
            size,
            modified: modified.into(),
            compression,
        }
    }

    /// Final path component as UTF-8, if it is representable.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}
