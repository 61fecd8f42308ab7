//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The line is not a JSON document. Skip it.
    #[display("line {_0} is not valid JSON")]
    InvalidJson(#[error(not(source))] usize),
    /// The record has no usable `@timestamp`. Skip it.
    #[display("line {_0} has a missing or unparseable @timestamp")]
    InvalidTimestamp(#[error(not(source))] usize),
    /// A field every record needs is absent or has the wrong shape.
    #[display("missing or malformed field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// Full-stat rows can only be built from JSON objects.
    #[display("record is not a JSON object")]
    NotAnObject,
    /// The log file could not be opened or read.
    #[display("could not read {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }

    /// Returns `true` if the offending line should be logged and skipped.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::InvalidJson(_) | ErrorKind::InvalidTimestamp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidJson(3).to_string(), "line 3 is not valid JSON");
        assert_eq!(ErrorKind::Io(PathBuf::from("site-2024-01-01.log")).to_string(), "could not read site-2024-01-01.log");
    }

    #[test]
    fn error_kind_classification() {
        assert!(ErrorKind::InvalidJson(1).is_recoverable());
        assert!(ErrorKind::InvalidTimestamp(1).is_recoverable());
        assert!(!ErrorKind::NotAnObject.is_recoverable());
        assert!(!ErrorKind::Io(PathBuf::new()).is_recoverable());
    }
}
