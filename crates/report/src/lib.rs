//! Spreadsheet and delimited-text reports.
//!
//! Two families of report are produced here:
//!
//! - [`stat`]: rows extracted from local log files, grouped and written as
//!   `stat[_full].xlsx` plus a tab-separated `stat[_full].csv`.
//! - [`index`]: aggregations computed by the analytics index (barcode
//!   presence, per-user query counts, frequent searches, slow queries).
//!
//! Every report is built as a [`Table`] first and only then written, so a
//! failed query never leaves a half-written workbook behind.

pub mod error;
pub mod index;
pub mod stat;
mod table;
mod write;

pub use crate::table::{Cell, Table};
pub use crate::write::{COMMA, TAB, ensure_unlocked, write_csv, write_xlsx};
