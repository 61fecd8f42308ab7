//! Command Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, Error>;

/// What failed, from the point of view of someone running the command.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("\"{}\" is not a directory", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    #[display("--since must not be later than --until")]
    InvalidRange,
    #[display("could not load configuration")]
    Config,
    #[display("log sync failed")]
    Sync,
    #[display("could not build log statistics")]
    Stats,
    #[display("could not build index reports")]
    Report,
}

impl ErrorKind {
    /// Returns `true` if running the command again might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Sync | ErrorKind::Report)
    }
}
