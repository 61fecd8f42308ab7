//! Statistical rows from JSON-lines request/response logs.
//!
//! Each log line is one JSON record of an API call: the `request` that was
//! made, the `response` that was returned, and an `@timestamp`. Records are
//! turned into flat [`Row`]s in one of two [`Mode`]s:
//!
//! - [`Mode::Barcode`] answers "which barcodes were asked for, and which were
//!   found?" with one small row per barcode and side.
//! - [`Mode::Full`] keeps (almost) everything, flattening each record into a
//!   single wide row. See [`FULL_STAT_EXCLUDED_FIELDS`] for what is dropped.

mod barcode;
mod consts;
pub mod error;
mod file;
mod full;
mod line;

use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::consts::FULL_STAT_EXCLUDED_FIELDS;
pub use crate::file::{discover, parse_file, parse_reader};
pub use crate::line::{extract, parse_line};

/// A flat record: column name to value, ordered by column name.
pub type Row = BTreeMap<String, Value>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Barcode-presence rows.
    #[default]
    Barcode,
    /// One flattened row per record.
    Full,
}
