//! Index Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be built from the configuration.
    #[display("invalid index client configuration")]
    Client,
    /// The index could not be reached, or didn't answer in time.
    #[display("analytics index unavailable")]
    Unavailable,
    /// The index answered with a non-success status.
    #[display("analytics index returned HTTP {_0}")]
    Status(#[error(not(source))] u16),
    /// The response body didn't have the expected shape.
    #[display("unexpected search response: {_0}")]
    InvalidResponse(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::Unavailable => true,
            ErrorKind::Status(status) => *status == 429 || *status >= 500,
            ErrorKind::Client | ErrorKind::InvalidResponse(_) => false,
        }
    }
}
