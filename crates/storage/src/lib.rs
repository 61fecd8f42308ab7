//! Log stores.
//!
//! Both ends of a sync run are a flat directory of log files: the remote
//! store rotates `*.log.gz` archives into one directory, and the local store
//! keeps their decompressed `*.log` counterparts. [`StorageBackend`] puts a
//! single async interface in front of both so that the sync pipeline can be
//! exercised against an in-memory store in tests.

pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
