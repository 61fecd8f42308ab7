//! Barcode-presence rows.
//!
//! Each request that asks for barcodes produces one `requested` row per
//! barcode, and each product the response found produces `found` rows for
//! the barcodes it matched.

use crate::Row;
use crate::consts::{BARCODES, BODY};
use serde_json::{Map, Value};

const REQUESTED: &str = "requested";
const FOUND: &str = "found";

pub(crate) fn barcode_rows(record: &Value, file: &str, date: &str) -> Vec<Row> {
    let mut rows = request_rows(record.get("request"), file, date);
    if rows.is_empty() {
        return rows;
    }
    // A single requested barcode is what every response row refers to, even
    // when the matched product lists no barcodes of its own.
    let single = match rows.as_slice() {
        [only] => only.get("barcode").cloned(),
        _ => None,
    };
    let mut found = response_rows(record.get("response"), file, date);
    if let Some(barcode) = single {
        for row in &mut found {
            row.entry("barcode".to_string()).or_insert_with(|| barcode.clone());
        }
    }
    rows.append(&mut found);
    rows
}

fn body(side: Option<&Value>) -> Option<&Map<String, Value>> {
    side?.get(BODY)?.as_object()
}

fn request_rows(request: Option<&Value>, file: &str, date: &str) -> Vec<Row> {
    let Some(barcodes) = body(request).and_then(|body| body.get(BARCODES)).and_then(Value::as_array) else {
        return Vec::new();
    };
    barcodes.iter().map(|barcode| row(file, date, Some(barcode), REQUESTED)).collect()
}

fn response_rows(response: Option<&Value>, file: &str, date: &str) -> Vec<Row> {
    let Some(nomenclatures) = body(response).and_then(|body| body.get("nomenclatures")).and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for nomenclature in nomenclatures {
        let barcodes = nomenclature.get(BARCODES).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        if barcodes.is_empty() {
            rows.push(row(file, date, None, FOUND));
            continue;
        }
        let mut seen: Vec<&Value> = Vec::with_capacity(barcodes.len());
        for barcode in barcodes {
            if !seen.contains(&barcode) {
                seen.push(barcode);
                rows.push(row(file, date, Some(barcode), FOUND));
            }
        }
    }
    rows
}

fn row(file: &str, date: &str, barcode: Option<&Value>, counter: &str) -> Row {
    let mut row = Row::new();
    row.insert("file".to_string(), Value::from(file));
    row.insert("date".to_string(), Value::from(date));
    if let Some(barcode) = barcode {
        row.insert("barcode".to_string(), barcode.clone());
    }
    row.insert(counter.to_string(), Value::from(1));
    row
}
