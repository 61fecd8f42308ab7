//! Report Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A report error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The destination exists but can't be opened for writing, most likely
    /// because a spreadsheet application has it open. Close it and retry.
    #[display("could not open {}, please close it", _0.display())]
    DestinationLocked(#[error(not(source))] PathBuf),
    /// Writing an artifact failed part-way.
    #[display("could not save {}", _0.display())]
    Save(#[error(not(source))] PathBuf),
    /// A query against the analytics index failed.
    #[display("index query for {_0} failed")]
    Index(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::DestinationLocked(_) | ErrorKind::Index(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::DestinationLocked(PathBuf::from("stat.xlsx")).to_string(),
            "could not open stat.xlsx, please close it"
        );
        assert_eq!(ErrorKind::Index("bcs").to_string(), "index query for bcs failed");
    }
}
