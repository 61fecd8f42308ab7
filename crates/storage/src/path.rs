//! Store-relative path validation.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a store-relative path.
///
/// Every backend joins paths onto a root directory (local or remote), so a
/// listing entry or a caller-supplied name must never climb out of it.
/// `.` and empty components are dropped, `..` is resolved, and anything that
/// would leave the root (or is empty after normalization) is rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath). Null bytes are
/// rejected explicitly.
///
/// ```
/// use std::path::Path;
/// use logstat_storage::validate_path;
///
/// assert!(validate_path("site-2024-01-01.log.gz").is_ok());
/// assert!(validate_path("archive/../site-2024-01-01.log").is_ok());
/// assert!(validate_path("../site-2024-01-01.log").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(validate_path("./logs//site.log/").unwrap(), Path::new("logs/site.log"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls (libssh2 included).
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}
