//! One JSON log line to rows.

use crate::consts::FULL_STAT_EXCLUDED_FIELDS;
use crate::error::{ErrorKind, Result};
use crate::{Mode, Row, barcode, full};
use exn::{OptionExt, ResultExt};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

const TIMESTAMP: &str = "@timestamp";

/// Map one decoded record onto statistical rows.
///
/// `date` is stamped onto every row. In [`Mode::Full`] the record must be a
/// JSON object; barcode mode simply yields nothing for anything it doesn't
/// recognise.
///
/// ```
/// use logstat_extract::{Mode, extract};
/// use serde_json::json;
/// use time::macros::date;
///
/// let record = json!({
///     "request": {"body": {"barcodes": ["111", "222"]}},
///     "response": {"body": {"nomenclatures": [{"barcodes": ["111"]}]}},
/// });
/// let rows = extract(&record, "site-2024-01-01.log.gz", date!(2024 - 01 - 01), Mode::Barcode).unwrap();
/// assert_eq!(rows.len(), 3);
/// assert_eq!(rows[2]["barcode"], "111");
/// assert_eq!(rows[2]["found"], 1);
/// ```
pub fn extract(record: &Value, file: &str, date: Date, mode: Mode) -> Result<Vec<Row>> {
    let date = date.to_string();
    match mode {
        Mode::Barcode => Ok(barcode::barcode_rows(record, file, &date)),
        Mode::Full => {
            let object = record.as_object().ok_or_raise(|| ErrorKind::NotAnObject)?;
            let mut row = full::flatten(object);
            row.insert("date".to_string(), Value::String(date));
            for field in FULL_STAT_EXCLUDED_FIELDS {
                row.remove(*field);
            }
            Ok(vec![row])
        },
    }
}

/// Parse one raw line. `line_number` is 1-based and only used for errors.
///
/// A line that isn't a JSON object has no `@timestamp`, so every failure
/// here is a recoverable one.
pub fn parse_line(line: &[u8], line_number: usize, file: &str, mode: Mode) -> Result<Vec<Row>> {
    let record: Value = serde_json::from_slice(line).or_raise(|| ErrorKind::InvalidJson(line_number))?;
    let date = record_date(&record).or_raise(|| ErrorKind::InvalidTimestamp(line_number))?;
    extract(&record, file, date, mode)
}

/// Calendar date of the record's RFC 3339 `@timestamp`, in its own offset.
fn record_date(record: &Value) -> Result<Date> {
    let timestamp = record.get(TIMESTAMP).and_then(Value::as_str).ok_or_raise(|| ErrorKind::MissingField(TIMESTAMP))?;
    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339).or_raise(|| ErrorKind::MissingField(TIMESTAMP))?;
    Ok(timestamp.date())
}
