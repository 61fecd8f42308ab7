//! Compression Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A compression error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Data is corrupt or malformed. Don't retry with the same input.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// The compressed stream ended before the archive was complete. The
    /// source may still be in the middle of being written.
    #[display("premature end of compressed stream")]
    Truncated,
    /// Writing the decompressed output failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Truncated)
    }

    /// Returns `true` if the input archive itself is at fault (as opposed to
    /// the output side of a stream).
    pub fn is_corrupt_input(&self) -> bool {
        matches!(self, ErrorKind::InvalidData | ErrorKind::Truncated)
    }
}
