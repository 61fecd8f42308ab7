//! Typed views of search responses.

use crate::error::{ErrorKind, Result};
use crate::query::OUTER;
use exn::{OptionExt, ResultExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A `terms` aggregation result.
#[derive(Debug, Clone, Deserialize)]
pub struct Terms<B> {
    /// Upper bound on the doc count error of each bucket.
    #[serde(default)]
    pub doc_count_error_upper_bound: i64,
    /// Documents in buckets that didn't make the size cut.
    #[serde(default)]
    pub sum_other_doc_count: u64,
    pub buckets: Vec<B>,
}

/// A bucket with no sub-aggregation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bucket {
    pub key: Value,
    pub doc_count: u64,
}

/// A bucket with a nested `terms` sub-aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct NestedBucket {
    pub key: Value,
    pub doc_count: u64,
    #[serde(rename = "agg_level_2")]
    pub nested: Terms<Bucket>,
}

impl NestedBucket {
    /// Documents across every nested bucket.
    pub fn nested_doc_count(&self) -> u64 {
        self.nested.buckets.iter().map(|bucket| bucket.doc_count).sum()
    }
}

/// A bucket with a `cardinality` sub-aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct CardinalityBucket {
    pub key: Value,
    pub doc_count: u64,
    #[serde(rename = "agg_level_2")]
    pub distinct: Cardinality,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Cardinality {
    pub value: u64,
}

/// Render a bucket key the way a spreadsheet cell should show it.
pub fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The outer aggregation of an aggregation response.
pub fn outer_terms<B: DeserializeOwned>(response: &Value) -> Result<Terms<B>> {
    let aggregation = response
        .get("aggregations")
        .and_then(|aggregations| aggregations.get(OUTER))
        .ok_or_raise(|| ErrorKind::InvalidResponse("missing aggregations.agg_level_1"))?;
    let terms: Terms<B> =
        serde_json::from_value(aggregation.clone()).or_raise(|| ErrorKind::InvalidResponse("malformed buckets"))?;
    tracing::debug!(
        buckets = terms.buckets.len(),
        doc_count_error_upper_bound = terms.doc_count_error_upper_bound,
        sum_other_doc_count = terms.sum_other_doc_count,
        "Parsed aggregation"
    );
    if terms.sum_other_doc_count > 0 {
        tracing::warn!(
            missing = terms.sum_other_doc_count,
            "Aggregation was truncated; raise the bucket size to see every key"
        );
    }
    Ok(terms)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Total,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

/// `hits.total` and the `_source` of every returned hit.
///
/// Accepts both the bare number and the `{"value": n}` forms of the total.
/// A total the index only reports as a lower bound (`"relation": "gte"`) is
/// rejected, since paging up to it would silently drop documents.
pub fn hits(response: &Value) -> Result<(u64, Vec<Value>)> {
    let hits = response.get("hits").ok_or_raise(|| ErrorKind::InvalidResponse("missing hits"))?;
    let hits: Hits = Hits::deserialize(hits).or_raise(|| ErrorKind::InvalidResponse("malformed hits"))?;
    let total = match hits.total {
        Total::Count(value) => value,
        Total::Object { relation: Some(relation), .. } if relation == "gte" => {
            exn::bail!(ErrorKind::InvalidResponse("hits.total is only a lower bound"))
        },
        Total::Object { value, .. } => value,
    };
    Ok((total, hits.hits.into_iter().map(|hit| hit.source).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_buckets() {
        let response = json!({
            "took": 3,
            "aggregations": {"agg_level_1": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 0,
                "buckets": [
                    {"key": "111", "doc_count": 5, "agg_level_2": {"buckets": [
                        {"key": "n1", "doc_count": 3},
                        {"key": "n2", "doc_count": 1},
                    ]}},
                    {"key": "222", "doc_count": 2, "agg_level_2": {"buckets": []}},
                ],
            }},
        });
        let terms: Terms<NestedBucket> = outer_terms(&response).unwrap();
        assert_eq!(terms.buckets.len(), 2);
        assert_eq!(key_text(&terms.buckets[0].key), "111");
        assert_eq!(terms.buckets[0].nested_doc_count(), 4);
        assert_eq!(terms.buckets[1].nested_doc_count(), 0);
    }

    #[test]
    fn test_cardinality_buckets() {
        let response = json!({"aggregations": {"agg_level_1": {"buckets": [
            {"key": 42, "doc_count": 7, "agg_level_2": {"value": 3}},
        ]}}});
        let terms: Terms<CardinalityBucket> = outer_terms(&response).unwrap();
        assert_eq!(key_text(&terms.buckets[0].key), "42");
        assert_eq!(terms.buckets[0].doc_count, 7);
        assert_eq!(terms.buckets[0].distinct.value, 3);
    }

    #[test]
    fn test_missing_aggregation() {
        let err = outer_terms::<Bucket>(&json!({"hits": {}})).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse(_)));
    }

    #[test]
    fn test_hits_total_forms() {
        let legacy = json!({"hits": {"total": 12, "hits": [{"_id": "a", "_source": {"x": 1}}]}});
        let (total, sources) = hits(&legacy).unwrap();
        assert_eq!(total, 12);
        assert_eq!(sources, vec![json!({"x": 1})]);

        let current = json!({"hits": {"total": {"value": 3, "relation": "eq"}, "hits": []}});
        assert_eq!(hits(&current).unwrap().0, 3);

        let capped = json!({"hits": {"total": {"value": 10000, "relation": "gte"}, "hits": []}});
        let err = hits(&capped).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidResponse("hits.total is only a lower bound"));
    }
}
