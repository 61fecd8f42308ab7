//! Sync Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file name does not follow `<prefix>-YYYY-MM-DD.log[.gz]`.
    #[display("invalid log file name: {_0}")]
    InvalidFileName(#[error(not(source))] String),
    /// Listing or downloading from the remote store failed. Files synced
    /// before the failure are kept.
    #[display("remote log store unavailable")]
    RemoteUnavailable,
    /// An archive could not be decompressed. It is skipped for this run and
    /// picked up again on the next one.
    #[display("corrupt archive: {_0}")]
    CorruptArchive(#[error(not(source))] String),
    /// The local store could not be listed, written to or cleaned up.
    #[display("local log store I/O failure")]
    LocalIo,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RemoteUnavailable | ErrorKind::CorruptArchive(_))
    }

    /// Returns `true` if the run should carry on with the next file.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::CorruptArchive(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::InvalidFileName("garbage.txt".to_string()).to_string(),
            "invalid log file name: garbage.txt"
        );
        assert_eq!(
            ErrorKind::CorruptArchive("site-2024-01-01.log.gz".to_string()).to_string(),
            "corrupt archive: site-2024-01-01.log.gz"
        );
    }

    #[test]
    fn error_kind_classification() {
        assert!(ErrorKind::CorruptArchive(String::new()).is_recoverable());
        assert!(!ErrorKind::RemoteUnavailable.is_recoverable());
        assert!(!ErrorKind::LocalIo.is_recoverable());
        assert!(ErrorKind::RemoteUnavailable.is_retryable());
        assert!(!ErrorKind::InvalidFileName(String::new()).is_retryable());
    }
}
