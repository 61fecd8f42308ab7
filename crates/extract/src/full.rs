//! Full-stat rows: one wide row per record.

use crate::Row;
use crate::consts::{BARCODES, BODY, LENGTH_SUFFIX, QUERY};
use serde_json::{Map, Value};

/// Flatten nested objects into `parent_child` keys.
///
/// - `body` segments are left out of key names.
/// - A `barcodes` list with a single entry becomes that entry; other
///   `barcodes` lists are kept as-is.
/// - Any other list is replaced by `<key>_len`, its length.
/// - `query` strings are percent-decoded.
/// - `null`, `false`, `0` and `""` are dropped.
pub(crate) fn flatten(record: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(&mut row, record, "");
    row
}

fn flatten_into(row: &mut Row, object: &Map<String, Value>, parent: &str) {
    for (key, value) in object {
        let name = join_key(parent, key);
        match value {
            Value::Object(child) => flatten_into(row, child, &name),
            Value::Array(items) if key == BARCODES => {
                let value = match items.as_slice() {
                    [only] => only.clone(),
                    _ => value.clone(),
                };
                row.insert(name, value);
            },
            Value::Array(items) => {
                row.insert(format!("{name}{LENGTH_SUFFIX}"), Value::from(items.len()));
            },
            Value::String(query) if key == QUERY => {
                let decoded = percent_decode(query);
                if !decoded.is_empty() {
                    row.insert(name, Value::String(decoded));
                }
            },
            scalar if is_truthy(scalar) => {
                row.insert(name, scalar.clone());
            },
            _ => {},
        }
    }
}

fn join_key(parent: &str, key: &str) -> String {
    let mut segments = Vec::with_capacity(2);
    if !parent.is_empty() {
        segments.push(parent);
    }
    segments.push(key);
    segments.retain(|segment| *segment != BODY);
    segments.join("_")
}

fn percent_decode(value: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn flat(value: Value) -> Row {
        flatten(value.as_object().unwrap())
    }

    #[test]
    fn test_nested_keys_skip_body() {
        let row = flat(json!({
            "request": {"body": {"search": {"text": "milk"}}, "method": "POST"},
            "user": {"id": "u1"},
        }));
        assert_eq!(row["request_search_text"], "milk");
        assert_eq!(row["request_method"], "POST");
        assert_eq!(row["user_id"], "u1");
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_lists() {
        let row = flat(json!({
            "request": {"body": {"barcodes": ["111"]}},
            "response": {"body": {"barcodes": ["111", "222"], "nomenclatures": [{}, {}, {}]}},
        }));
        assert_eq!(row["request_barcodes"], "111");
        assert_eq!(row["response_barcodes"], json!(["111", "222"]));
        assert_eq!(row["response_nomenclatures_len"], 3);
    }

    #[test]
    fn test_empty_lists_are_kept() {
        let row = flat(json!({"barcodes": [], "items": []}));
        assert_eq!(row["barcodes"], json!([]));
        assert_eq!(row["items_len"], 0);
    }

    #[test]
    fn test_query_is_percent_decoded() {
        let row = flat(json!({"request": {"query": "text=%D0%BC%D0%BE%D0%BB%D0%BE%D0%BA%D0%BE&page=1"}}));
        assert_eq!(row["request_query"], "text=молоко&page=1");
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(false))]
    #[case(json!(0))]
    #[case(json!(0.0))]
    #[case(json!(""))]
    fn test_falsy_scalars_are_dropped(#[case] value: Value) {
        let row = flat(json!({"kept": 1, "dropped": value}));
        assert!(!row.contains_key("dropped"));
        assert_eq!(row["kept"], 1);
    }

    #[test]
    fn test_top_level_body() {
        let row = flat(json!({"body": {"status": "ok"}}));
        assert_eq!(row["status"], "ok");
    }
}
