//! Search request bodies.
//!
//! Every aggregation query names its outer aggregation `agg_level_1` and any
//! sub-aggregation `agg_level_2`; [`crate::response`] relies on those names.

use serde_json::{Value, json};
use time::OffsetDateTime;

pub const OUTER: &str = "agg_level_1";
pub const INNER: &str = "agg_level_2";

pub const REQUESTED_BARCODES: &str = "request.body.barcodes.keyword";
pub const FOUND_NOMENCLATURES: &str = "response.body.nomenclatures.id.keyword";
pub const SEARCH_TEXT: &str = "request.body.search.text.keyword";
pub const USER_ID: &str = "user.id.keyword";
pub const REQUEST_QUERY: &str = "request.query.keyword";
pub const TIMESTAMP: &str = "@timestamp";

/// Only documents where `field` is present.
pub fn field_exists(field: &str) -> Value {
    json!({"bool": {"filter": [{"exists": {"field": field}}]}})
}

fn terms(field: &str, size: u32) -> Value {
    json!({"field": field, "size": size})
}

/// Requests per barcode, with the products found for it.
pub fn barcode_presence(size: u32) -> Value {
    json!({
        "size": 0,
        "query": field_exists(REQUESTED_BARCODES),
        "aggs": {
            OUTER: {
                "terms": terms(REQUESTED_BARCODES, size),
                "aggs": {INNER: {"terms": terms(FOUND_NOMENCLATURES, size)}},
            },
        },
    })
}

/// Per user: requests of `field`, and how many distinct values were asked for.
pub fn per_user_counts(field: &str, size: u32) -> Value {
    json!({
        "size": 0,
        "query": field_exists(field),
        "aggs": {
            OUTER: {
                "terms": terms(USER_ID, size),
                "aggs": {INNER: {"cardinality": {"field": field}}},
            },
        },
    })
}

/// The most common free-text searches.
pub fn most_frequent_searches(size: u32) -> Value {
    json!({
        "size": 0,
        "query": field_exists(SEARCH_TEXT),
        "aggs": {OUTER: {"terms": terms(SEARCH_TEXT, size)}},
    })
}

/// Bounds on `@timestamp`; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
}

impl TimeRange {
    fn clause(&self) -> Option<Value> {
        if self.since.is_none() && self.until.is_none() {
            return None;
        }
        let mut range = serde_json::Map::new();
        if let Some(since) = self.since {
            range.insert("gte".to_string(), json!(epoch_millis(since)));
        }
        if let Some(until) = self.until {
            range.insert("lte".to_string(), json!(epoch_millis(until)));
        }
        range.insert("format".to_string(), json!("epoch_millis"));
        Some(json!({"range": {TIMESTAMP: range}}))
    }
}

fn epoch_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Requests that carried a query string, optionally within `range`.
pub fn query_times(range: &TimeRange) -> Value {
    let mut must: Vec<Value> = range.clause().into_iter().collect();
    must.push(json!({"exists": {"field": REQUEST_QUERY}}));
    json!({"bool": {"must": must}})
}

/// `_source` fields needed to compute request durations.
pub const QUERY_TIME_SOURCE: &[&str] = &["@timestamp", "request.time", "response.time", "request.query"];
