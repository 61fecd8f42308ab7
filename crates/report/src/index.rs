//! Reports computed by the analytics index.

use crate::error::{ErrorKind, Result};
use crate::table::{Cell, Table};
use crate::write::{COMMA, ensure_unlocked, write_csv, write_xlsx};
use exn::ResultExt;
use logstat_config::IndexConfig;
use logstat_index::response::{Bucket, CardinalityBucket, NestedBucket, key_text, outer_terms};
use logstat_index::{Search, TimeRange, query, search_all};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const BCS: &str = "bcs.xlsx";
pub const BCS_NOT_FOUND: &str = "bcs_not_found.xlsx";
pub const USER_QUERIES: &str = "user_queries.xlsx";
pub const MOST_FREQUENT_QUERIES: &str = "most_frequent_queries.xlsx";
pub const QUERY_TIMES: &str = "logstat.csv";

/// Requests per barcode and how many products were found for it.
#[instrument(skip_all)]
pub async fn barcodes(client: &dyn Search, config: &IndexConfig) -> Result<Table> {
    let response = client
        .search(&query::barcode_presence(config.max_buckets))
        .await
        .or_raise(|| ErrorKind::Index("barcodes"))?;
    let terms = outer_terms::<NestedBucket>(&response).or_raise(|| ErrorKind::Index("barcodes"))?;
    let mut table = Table::new(["barcode", "requested", "found"]);
    for bucket in &terms.buckets {
        table.push([Cell::from(&bucket.key), bucket.doc_count.into(), bucket.nested_doc_count().into()]);
    }
    Ok(table)
}

/// The rows of a [`barcodes`] table with nothing found.
pub fn not_found(barcodes: &Table) -> Table {
    let found = barcodes.column("found");
    barcodes.filtered(|row| found.is_some_and(|i| row[i] == Cell::Int(0)))
}

#[derive(Default)]
struct UserCounts {
    key: Cell,
    barcodes: Option<(u64, u64)>,
    searches: Option<(u64, u64)>,
}

async fn per_user(client: &dyn Search, field: &str, size: u32) -> Result<Vec<CardinalityBucket>> {
    let response = client
        .search(&query::per_user_counts(field, size))
        .await
        .or_raise(|| ErrorKind::Index("user queries"))?;
    let terms = outer_terms::<CardinalityBucket>(&response).or_raise(|| ErrorKind::Index("user queries"))?;
    Ok(terms.buckets)
}

/// Barcode and free-text query counts per user.
///
/// Users are merged across both aggregations; a user missing from one side
/// has empty cells for it.
#[instrument(skip_all)]
pub async fn user_queries(client: &dyn Search, config: &IndexConfig) -> Result<Table> {
    let barcode_buckets = per_user(client, query::REQUESTED_BARCODES, config.max_buckets).await?;
    let search_buckets = per_user(client, query::SEARCH_TEXT, config.max_buckets).await?;

    let mut users: BTreeMap<String, UserCounts> = BTreeMap::new();
    for bucket in barcode_buckets {
        let user = users.entry(key_text(&bucket.key)).or_default();
        user.key = Cell::from(&bucket.key);
        user.barcodes = Some((bucket.doc_count, bucket.distinct.value));
    }
    for bucket in search_buckets {
        let user = users.entry(key_text(&bucket.key)).or_default();
        user.key = Cell::from(&bucket.key);
        user.searches = Some((bucket.doc_count, bucket.distinct.value));
    }

    let mut table = Table::new([
        "user_id",
        "bc_query_count",
        "bc_unique_query_count",
        "search_query_count",
        "search_unique_query_count",
    ]);
    for user in users.into_values() {
        table.push([
            user.key,
            user.barcodes.map(|(count, _)| count).into(),
            user.barcodes.map(|(_, unique)| unique).into(),
            user.searches.map(|(count, _)| count).into(),
            user.searches.map(|(_, unique)| unique).into(),
        ]);
    }
    Ok(table)
}

/// The most common free-text searches and how often each was made.
#[instrument(skip_all)]
pub async fn most_frequent_queries(client: &dyn Search, config: &IndexConfig) -> Result<Table> {
    let response = client
        .search(&query::most_frequent_searches(config.frequent_queries_size))
        .await
        .or_raise(|| ErrorKind::Index("most frequent queries"))?;
    let terms = outer_terms::<Bucket>(&response).or_raise(|| ErrorKind::Index("most frequent queries"))?;
    let mut table = Table::new(["search_text", "count"]);
    for bucket in &terms.buckets {
        table.push([Cell::from(&bucket.key), bucket.doc_count.into()]);
    }
    Ok(table)
}

/// Duration of one request: `response.time - request.time`.
fn duration(source: &Value) -> Option<Cell> {
    let started = source.pointer("/request/time")?;
    let finished = source.pointer("/response/time")?;
    match (started.as_i64(), finished.as_i64()) {
        (Some(started), Some(finished)) => Some(Cell::Int(finished - started)),
        _ => Some(Cell::Float(finished.as_f64()? - started.as_f64()?)),
    }
}

fn slower(a: &Cell, b: &Cell) -> std::cmp::Ordering {
    let value = |cell: &Cell| match cell {
        Cell::Int(i) => *i as f64,
        Cell::Float(x) => *x,
        _ => f64::NEG_INFINITY,
    };
    value(b).total_cmp(&value(a))
}

/// The slowest query-string requests, slowest first.
///
/// Hits without both a request and a response time are skipped.
#[instrument(skip_all, fields(since = ?range.since, until = ?range.until))]
pub async fn query_times(client: &dyn Search, config: &IndexConfig, range: &TimeRange) -> Result<Table> {
    let sources = search_all(client, &query::query_times(range), query::QUERY_TIME_SOURCE, config.page_size)
        .await
        .or_raise(|| ErrorKind::Index("query times"))?;
    let mut rows: Vec<[Cell; 3]> = Vec::with_capacity(sources.len());
    for source in &sources {
        let Some(time) = duration(source) else {
            tracing::warn!(source = %source, "Skipping hit without request and response times");
            continue;
        };
        let text = source.pointer("/request/query").map_or(Cell::Empty, Cell::from);
        let timestamp = source.get("@timestamp").map_or(Cell::Empty, Cell::from);
        rows.push([text, time, timestamp]);
    }
    // Stable, so equal times keep index order.
    rows.sort_by(|a, b| slower(&a[1], &b[1]));
    rows.truncate(config.slowest_queries);

    let mut table = Table::new(["query", "time", "timestamp"]);
    for row in rows {
        table.push(row);
    }
    Ok(table)
}

/// Run every index report and write the artifacts into `dir`.
///
/// Every destination is checked for a lock before the first query is sent.
/// Returns the paths written, in order.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn write_index_reports(
    client: &dyn Search,
    config: &IndexConfig,
    dir: &Path,
    range: &TimeRange,
) -> Result<Vec<PathBuf>> {
    let path = |name: &str| dir.join(name);
    for name in [BCS, USER_QUERIES, MOST_FREQUENT_QUERIES, BCS_NOT_FOUND, QUERY_TIMES] {
        ensure_unlocked(&path(name))?;
    }
    let mut written = Vec::new();

    let bcs = barcodes(client, config).await?;
    write_xlsx(&bcs, &path(BCS))?;
    written.push(path(BCS));

    let users = user_queries(client, config).await?;
    write_xlsx(&users, &path(USER_QUERIES))?;
    written.push(path(USER_QUERIES));

    let frequent = most_frequent_queries(client, config).await?;
    write_xlsx(&frequent, &path(MOST_FREQUENT_QUERIES))?;
    written.push(path(MOST_FREQUENT_QUERIES));

    let missing = not_found(&bcs);
    tracing::info!(barcodes = bcs.len(), not_found = missing.len(), "Barcode presence computed");
    write_xlsx(&missing, &path(BCS_NOT_FOUND))?;
    written.push(path(BCS_NOT_FOUND));

    let times = query_times(client, config, range).await?;
    write_csv(&times, &path(QUERY_TIMES), COMMA)?;
    written.push(path(QUERY_TIMES));

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logstat_index::mock::MockSearch;
    use serde_json::json;

    fn aggregation(buckets: Value) -> Value {
        json!({"aggregations": {"agg_level_1": {
            "doc_count_error_upper_bound": 0,
            "sum_other_doc_count": 0,
            "buckets": buckets,
        }}})
    }

    fn barcode_response() -> Value {
        aggregation(json!([
            {"key": "111", "doc_count": 5, "agg_level_2": {"buckets": [
                {"key": "n1", "doc_count": 3},
                {"key": "n2", "doc_count": 1},
            ]}},
            {"key": "222", "doc_count": 2, "agg_level_2": {"buckets": []}},
        ]))
    }

    fn hits(total: u64, sources: Value) -> Value {
        let hits: Vec<Value> = sources
            .as_array()
            .unwrap()
            .iter()
            .map(|source| json!({"_source": source}))
            .collect();
        json!({"hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}})
    }

    fn request(query: &str, started: i64, finished: i64) -> Value {
        json!({
            "@timestamp": "2018-10-24T10:00:00.000Z",
            "request": {"query": query, "time": started},
            "response": {"time": finished},
        })
    }

    #[tokio::test]
    async fn test_barcodes_and_not_found() {
        let client = MockSearch::new([barcode_response()]);
        let table = barcodes(&client, &IndexConfig::default()).await.unwrap();
        assert_eq!(table.columns, ["barcode", "requested", "found"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::from("111"), Cell::Int(5), Cell::Int(4)],
                vec![Cell::from("222"), Cell::Int(2), Cell::Int(0)],
            ]
        );
        let missing = not_found(&table);
        assert_eq!(missing.rows, vec![vec![Cell::from("222"), Cell::Int(2), Cell::Int(0)]]);
        assert_eq!(client.requests()[0]["aggs"]["agg_level_1"]["terms"]["size"], 1_000_000);
    }

    #[tokio::test]
    async fn test_user_queries_outer_merge() {
        let client = MockSearch::new([
            aggregation(json!([
                {"key": "u1", "doc_count": 4, "agg_level_2": {"value": 2}},
                {"key": "u2", "doc_count": 1, "agg_level_2": {"value": 1}},
            ])),
            aggregation(json!([
                {"key": "u3", "doc_count": 9, "agg_level_2": {"value": 7}},
                {"key": "u1", "doc_count": 3, "agg_level_2": {"value": 3}},
            ])),
        ]);
        let table = user_queries(&client, &IndexConfig::default()).await.unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::from("u1"), Cell::Int(4), Cell::Int(2), Cell::Int(3), Cell::Int(3)],
                vec![Cell::from("u2"), Cell::Int(1), Cell::Int(1), Cell::Empty, Cell::Empty],
                vec![Cell::from("u3"), Cell::Empty, Cell::Empty, Cell::Int(9), Cell::Int(7)],
            ]
        );
        let requests = client.requests();
        assert_eq!(requests[0]["aggs"]["agg_level_1"]["aggs"]["agg_level_2"]["cardinality"]["field"], query::REQUESTED_BARCODES);
        assert_eq!(requests[1]["aggs"]["agg_level_1"]["aggs"]["agg_level_2"]["cardinality"]["field"], query::SEARCH_TEXT);
    }

    #[tokio::test]
    async fn test_most_frequent_queries() {
        let client = MockSearch::new([aggregation(json!([
            {"key": "milk", "doc_count": 12},
            {"key": "bread", "doc_count": 7},
        ]))]);
        let table = most_frequent_queries(&client, &IndexConfig::default()).await.unwrap();
        assert_eq!(table.columns, ["search_text", "count"]);
        assert_eq!(table.rows[0], vec![Cell::from("milk"), Cell::Int(12)]);
        assert_eq!(client.requests()[0]["aggs"]["agg_level_1"]["terms"]["size"], 10_000);
    }

    #[tokio::test]
    async fn test_query_times_sorted_and_truncated() {
        let sources = json!([
            request("q=a", 100, 150),
            request("q=b", 100, 400),
            {"@timestamp": "2018-10-24T10:00:00.000Z", "request": {"query": "q=c"}},
            request("q=d", 100, 200),
        ]);
        let client = MockSearch::new([hits(4, json!([])), hits(4, sources)]);
        let config = IndexConfig { slowest_queries: 2, ..IndexConfig::default() };
        let table = query_times(&client, &config, &TimeRange::default()).await.unwrap();
        assert_eq!(table.columns, ["query", "time", "timestamp"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][..2], [Cell::from("q=b"), Cell::Int(300)]);
        assert_eq!(table.rows[1][..2], [Cell::from("q=d"), Cell::Int(100)]);
        assert_eq!(client.requests()[1]["size"], 1000);
    }

    #[tokio::test]
    async fn test_index_failure_is_attributed() {
        let client = MockSearch::new([]);
        let err = barcodes(&client, &IndexConfig::default()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Index("barcodes"));
    }

    #[tokio::test]
    async fn test_write_index_reports() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockSearch::new([
            barcode_response(),
            aggregation(json!([{"key": "u1", "doc_count": 4, "agg_level_2": {"value": 2}}])),
            aggregation(json!([])),
            aggregation(json!([{"key": "milk", "doc_count": 12}])),
            hits(1, json!([])),
            hits(1, json!([request("q=a", 100, 150)])),
        ]);
        let written = write_index_reports(&client, &IndexConfig::default(), dir.path(), &TimeRange::default())
            .await
            .unwrap();
        let names: Vec<_> = written.iter().filter_map(|path| path.file_name()?.to_str()).collect();
        assert_eq!(names, [BCS, USER_QUERIES, MOST_FREQUENT_QUERIES, BCS_NOT_FOUND, QUERY_TIMES]);
        assert!(written.iter().all(|path| path.is_file()));
        let csv = std::fs::read_to_string(dir.path().join(QUERY_TIMES)).unwrap();
        assert_eq!(csv, "query,time,timestamp\nq=a,50,2018-10-24T10:00:00.000Z\n");
    }
}
