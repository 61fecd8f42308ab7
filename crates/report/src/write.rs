//! Artifact writers.

use crate::error::{ErrorKind, Result};
use crate::table::{Cell, Table};
use exn::ResultExt;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::instrument;

/// Delimiter of the `stat[_full].csv` artifacts.
pub const TAB: u8 = b'\t';
/// Delimiter of every other CSV artifact.
pub const COMMA: u8 = b',';

/// Fail with [`DestinationLocked`](ErrorKind::DestinationLocked) if `path`
/// exists but can't be opened for reading and writing.
///
/// Meant to be called before any work whose result would go to `path`.
pub fn ensure_unlocked(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map(drop)
        .or_raise(|| ErrorKind::DestinationLocked(path.to_path_buf()))
}

/// Write `table` as a single-sheet workbook with a bold header row.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    fill_sheet(workbook.add_worksheet(), table).or_raise(|| ErrorKind::Save(path.to_path_buf()))?;
    workbook.save(path).or_raise(|| ErrorKind::Save(path.to_path_buf()))
}

fn fill_sheet(sheet: &mut Worksheet, table: &Table) -> std::result::Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, name) in (0u16..).zip(&table.columns) {
        sheet.write_string_with_format(0, col, name, &bold)?;
    }
    for (row, cells) in (1u32..).zip(&table.rows) {
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Empty => {},
                Cell::Int(i) => {
                    sheet.write_number(row, col, *i as f64)?;
                },
                Cell::Float(x) => {
                    sheet.write_number(row, col, *x)?;
                },
                Cell::Text(s) => {
                    sheet.write_string(row, col, s)?;
                },
            }
        }
    }
    Ok(())
}

/// Write `table` as delimited text with a header line.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_csv(table: &Table, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .or_raise(|| ErrorKind::Save(path.to_path_buf()))?;
    writer.write_record(&table.columns).or_raise(|| ErrorKind::Save(path.to_path_buf()))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::to_string))
            .or_raise(|| ErrorKind::Save(path.to_path_buf()))?;
    }
    writer.flush().or_raise(|| ErrorKind::Save(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut table = Table::new(["barcode", "requested", "found"]);
        table.push([Cell::from("111"), Cell::Int(2), Cell::Int(1)]);
        table.push([Cell::from("with\ttab"), Cell::Float(0.5), Cell::Empty]);
        table
    }

    #[test]
    fn test_write_csv_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.csv");
        write_csv(&table(), &path, TAB).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "barcode\trequested\tfound\n111\t2\t1\n\"with\ttab\"\t0.5\t\n");
    }

    #[test]
    fn test_write_csv_comma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logstat.csv");
        write_csv(&table(), &path, COMMA).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("barcode,requested,found\n111,2,1\n"));
    }

    #[test]
    fn test_write_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.xlsx");
        write_xlsx(&table(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        // An xlsx workbook is a zip archive.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("stat.csv");
        let err = write_csv(&table(), &path, TAB).unwrap_err();
        assert_eq!(*err, ErrorKind::Save(path));
    }

    #[test]
    fn test_ensure_unlocked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.xlsx");
        ensure_unlocked(&path).unwrap();
        std::fs::write(&path, b"PK").unwrap();
        ensure_unlocked(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_unlocked_reports_read_only_destination() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.xlsx");
        std::fs::write(&path, b"PK").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();
        let result = ensure_unlocked(&path);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        // Root ignores file permissions, in which case there is nothing to report.
        if let Err(err) = result {
            assert_eq!(*err, ErrorKind::DestinationLocked(path));
        }
    }

    #[test]
    fn test_ensure_unlocked_reports_directory_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.xlsx");
        std::fs::create_dir(&path).unwrap();
        let err = ensure_unlocked(&path).unwrap_err();
        assert_eq!(*err, ErrorKind::DestinationLocked(path));
    }
}
