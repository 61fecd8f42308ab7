//! Incremental sync of dated log archives.
//!
//! A remote store rotates one gzip archive per day into a flat directory
//! (`<prefix>-YYYY-MM-DD.log.gz`). Each run pulls the archives that are
//! missing locally, dated strictly after the newest local log (the
//! *watermark*) and strictly before today, and inflates them into the local
//! store as `<prefix>-YYYY-MM-DD.log`.
//!
//! ```no_run
//! use logstat_storage::BackendHandle;
//! use time::macros::date;
//!
//! # async fn example(remote: BackendHandle, local: BackendHandle) -> logstat_sync::error::Result<()> {
//! let report = logstat_sync::sync(&remote, &local, date!(2024 - 01 - 05)).await?;
//! println!("{} synced, {} corrupt", report.synced.len(), report.corrupt.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
mod name;
mod pipeline;
pub mod resolve;

pub use crate::filter::{Selection, Watermark};
pub use crate::name::LogFileName;
pub use crate::pipeline::{SyncOutcome, SyncReport, sync, sync_file};
