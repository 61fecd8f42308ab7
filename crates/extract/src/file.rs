//! Log files to rows.

use crate::error::{ErrorKind, Result};
use crate::{Mode, Row, parse_line};
use exn::ResultExt;
use logstat_compress::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Every `*.log` and `*.log.gz` file directly inside `dir`, sorted by name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.or_raise(|| ErrorKind::Io(dir.to_path_buf()))?.path();
        if path.is_file() && is_log_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_log_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let name = Compression::from_path(path).strip_extension(name).unwrap_or(name);
    name.ends_with(".log")
}

/// Parse every line of a (possibly gzip-compressed) log file.
///
/// The format is sniffed from the first bytes, so a `.log.gz` that was
/// already inflated (or the reverse) is still read; the mismatch is logged.
/// Rows carry the file's base name. See [`parse_reader`] for how bad input
/// is handled.
#[instrument(skip_all, fields(file = %path.display(), rows))]
pub fn parse_file(path: &Path, mode: Mode) -> Result<Vec<Row>> {
    let file = File::open(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let mut file = BufReader::new(file);
    let declared = Compression::from_path(path);
    let head = file.fill_buf().or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let compression = if head.is_empty() || declared.check_magic_bytes(head) {
        declared
    } else {
        let detected = Compression::from_magic_bytes(head);
        tracing::warn!(%declared, %detected, "File contents don't match its extension");
        detected
    };
    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let reader = BufReader::new(compression.wrap_reader(file));
    let rows = parse_reader(reader, &name, compression, mode)?;
    tracing::Span::current().record("rows", rows.len());
    Ok(rows)
}

/// Parse newline-delimited JSON records from `reader`.
///
/// Lines that aren't JSON or lack a timestamp are logged and skipped. A
/// damaged gzip stream ends the file early, keeping the rows read so far.
pub fn parse_reader<R: BufRead>(reader: R, name: &str, compression: Compression, mode: Mode) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for (index, line) in reader.split(b'\n').enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e)
                if compression != Compression::None
                    && matches!(e.kind(), IoErrorKind::UnexpectedEof | IoErrorKind::InvalidData | IoErrorKind::InvalidInput) =>
            {
                tracing::warn!(file = name, line = line_number, error = %e, "Compressed stream is damaged; keeping rows read so far");
                break;
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(PathBuf::from(name))),
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match parse_line(&line, line_number, name, mode) {
            Ok(mut parsed) => rows.append(&mut parsed),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(file = name, line = line_number, error = %*e, "Skipping record");
            },
            Err(e) => return Err(e),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(day: u8, barcode: &str) -> String {
        format!(
            "{{\"@timestamp\":\"2024-01-0{day}T10:00:00Z\",\"request\":{{\"body\":{{\"barcodes\":[\"{barcode}\"]}}}},\"response\":{{\"body\":{{\"nomenclatures\":[]}}}}}}\n"
        )
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let input = format!("{}not json\n\n{{\"no\":\"timestamp\"}}\n{}", line(1, "111"), line(1, "222"));
        let rows = parse_reader(Cursor::new(input), "site.log", Compression::None, Mode::Barcode).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["barcode"], "222");
        assert_eq!(rows[1]["file"], "site.log");
    }

    #[test]
    fn test_full_mode() {
        let input = "{\"@timestamp\":\"2024-01-01T00:00:00Z\"}\n";
        let rows = parse_reader(Cursor::new(input), "f", Compression::None, Mode::Full).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2024-01-01");
        // A JSON string has no `@timestamp`, so it's skipped before flattening.
        let input = "\"2024-01-01T00:00:00Z\"\n";
        assert!(parse_reader(Cursor::new(input), "f", Compression::None, Mode::Full).unwrap().is_empty());
    }

    #[test]
    fn test_parse_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-2024-01-01.log.gz");
        let content = format!("{}{}", line(1, "111"), line(1, "222"));
        std::fs::write(&path, Compression::Gzip.compress(content.as_bytes()).unwrap()).unwrap();
        let rows = parse_file(&path, Mode::Barcode).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["file"], "site-2024-01-01.log.gz");
    }

    #[test]
    fn test_format_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let inflated = dir.path().join("site-2024-01-01.log.gz");
        std::fs::write(&inflated, line(1, "111")).unwrap();
        assert_eq!(parse_file(&inflated, Mode::Barcode).unwrap().len(), 1);

        let compressed = dir.path().join("site-2024-01-02.log");
        std::fs::write(&compressed, Compression::Gzip.compress(line(2, "222").as_bytes()).unwrap()).unwrap();
        let rows = parse_file(&compressed, Mode::Barcode).unwrap();
        assert_eq!(rows[0]["barcode"], "222");
    }

    #[test]
    fn test_truncated_gzip_keeps_earlier_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-2024-01-01.log.gz");
        // Varying barcodes keep the stream from compressing down to nothing.
        let content: String = (0..2000).map(|n| line(1, &format!("{:013}", n * 7919))).collect();
        let mut compressed = Compression::Gzip.compress(content.as_bytes()).unwrap();
        compressed.truncate(compressed.len() / 2);
        std::fs::write(&path, compressed).unwrap();
        let rows = parse_file(&path, Mode::Barcode).unwrap();
        assert!(!rows.is_empty());
        assert!(rows.len() < 2000);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-2024-01-01.log");
        let err = parse_file(&path, Mode::Barcode).unwrap_err();
        assert_eq!(*err, ErrorKind::Io(path));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-2024-01-02.log", "a-2024-01-01.log.gz", "notes.txt", "stat.xlsx", "c.log.bz2"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.log")).unwrap();
        let found = discover(dir.path()).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a-2024-01-01.log.gz", "b-2024-01-02.log"]);
    }
}
