//! The `stats` report: log rows grouped into a spreadsheet.

use crate::error::Result;
use crate::table::{Cell, Table};
use crate::write::{TAB, write_csv, write_xlsx};
use logstat_extract::{Mode, Row};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const BARCODE_COLUMNS: [&str; 5] = ["date", "file", "barcode", "requested", "found"];

/// Where the `stats` artifacts of `mode` go inside `dir`: the workbook and
/// the tab-separated text file, in that order.
pub fn artifact_paths(dir: &Path, mode: Mode) -> (PathBuf, PathBuf) {
    let stem = match mode {
        Mode::Barcode => "stat",
        Mode::Full => "stat_full",
    };
    (dir.join(format!("{stem}.xlsx")), dir.join(format!("{stem}.csv")))
}

pub fn stat_table(rows: &[Row], mode: Mode) -> Table {
    match mode {
        Mode::Barcode => barcode_table(rows),
        Mode::Full => full_table(rows),
    }
}

fn text(row: &Row, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn count(row: &Row, key: &str) -> u64 {
    row.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Sum `requested` and `found` per `(date, file, barcode)`.
///
/// Rows without a barcode are counted under an empty one.
pub fn barcode_table(rows: &[Row]) -> Table {
    let mut groups: BTreeMap<(String, String, String), (u64, u64)> = BTreeMap::new();
    for row in rows {
        let key = (text(row, "date"), text(row, "file"), text(row, "barcode"));
        let (requested, found) = groups.entry(key).or_default();
        *requested += count(row, "requested");
        *found += count(row, "found");
    }
    let mut table = Table::new(BARCODE_COLUMNS);
    for ((date, file, barcode), (requested, found)) in groups {
        table.push([date.into(), file.into(), barcode.into(), requested.into(), found.into()]);
    }
    table
}

/// One row per record under the sorted union of every record's keys.
pub fn full_table(rows: &[Row]) -> Table {
    let columns: BTreeSet<&str> = rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect();
    let mut table = Table::new(columns.iter().copied());
    for row in rows {
        table.push(columns.iter().map(|column| row.get(*column).map_or(Cell::Empty, Cell::from)));
    }
    table
}

/// Build the table for `rows` and write both artifacts into `dir`.
///
/// Returns the paths written. The caller is expected to have checked the
/// workbook with [`ensure_unlocked`](crate::ensure_unlocked) beforehand.
pub fn write_stat_report(rows: &[Row], mode: Mode, dir: &Path) -> Result<Vec<PathBuf>> {
    let table = stat_table(rows, mode);
    let (xlsx, csv) = artifact_paths(dir, mode);
    write_xlsx(&table, &xlsx)?;
    write_csv(&table, &csv, TAB)?;
    tracing::info!(rows = table.len(), columns = table.columns.len(), "Statistics saved");
    Ok(vec![xlsx, csv])
}
