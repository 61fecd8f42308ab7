//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Could not reach or talk to a remote store.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote store rejected our credentials.
    #[display("authentication failed for {_0}")]
    Authentication(#[error(not(source))] String),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }

    /// Returns `true` if the error came from reaching the store rather than
    /// from the file being asked for.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::NotFound(PathBuf::from("site-2024-01-01.log")).to_string(),
            "file not found: site-2024-01-01.log"
        );
        assert_eq!(
            ErrorKind::Authentication("logs@example.com:22".to_string()).to_string(),
            "authentication failed for logs@example.com:22"
        );
    }

    #[test]
    fn error_kind_classification() {
        assert!(ErrorKind::Network("refused".to_string()).is_retryable());
        assert!(ErrorKind::Network("refused".to_string()).is_connectivity());
        assert!(ErrorKind::Authentication("host".to_string()).is_connectivity());
        assert!(!ErrorKind::Authentication("host".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound(PathBuf::from("x")).is_connectivity());
    }
}
