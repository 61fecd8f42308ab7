//! Sequential from/size pagination.

use crate::client::Search;
use crate::error::Result;
use crate::response::hits;
use serde_json::{Value, json};
use tracing::instrument;

/// Fetch the `_source` of every document matching `query`.
///
/// A one-document count request comes first, with `track_total_hits` set so
/// the index reports the exact total rather than a capped lower bound. Pages
/// of `page_size` are then requested one after another until the offset
/// reaches that total. Documents indexed after the count request are not
/// picked up, and an interrupted run starts again from the first page.
#[instrument(skip_all, fields(page_size = page_size, total))]
pub async fn search_all(client: &dyn Search, query: &Value, source: &[&str], page_size: u32) -> Result<Vec<Value>> {
    let page_size = u64::from(page_size.max(1));
    let body = |from: u64, size: u64| json!({"from": from, "size": size, "query": query, "_source": source});

    let mut count = body(0, 1);
    count["track_total_hits"] = Value::Bool(true);
    let (total, _) = hits(&client.search(&count).await?)?;
    tracing::Span::current().record("total", total);

    let mut documents = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
    let mut from = 0;
    while from < total {
        let (_, page) = hits(&client.search(&body(from, page_size)).await?)?;
        documents.extend(page);
        from += page_size;
        tracing::debug!(from, total, "Fetched page");
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockSearch;

    fn page(total: u64, ids: &[u64]) -> Value {
        let hits: Vec<Value> = ids.iter().map(|id| json!({"_source": {"id": id}})).collect();
        json!({"hits": {"total": {"value": total}, "hits": hits}})
    }

    #[tokio::test]
    async fn test_stops_at_reported_total() {
        let client = MockSearch::new([page(5, &[0]), page(5, &[0, 1]), page(5, &[2, 3]), page(5, &[4])]);
        let query = json!({"match_all": {}});
        let documents = search_all(&client, &query, &["id"], 2).await.unwrap();

        assert_eq!(documents.len(), 5);
        let requests = client.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0]["size"], 1);
        assert_eq!(requests[0]["track_total_hits"], true);
        assert!(requests[1].get("track_total_hits").is_none());
        assert_eq!(requests[1]["from"], 0);
        assert_eq!(requests[2]["from"], 2);
        assert_eq!(requests[3]["from"], 4);
        assert_eq!(requests[3]["size"], 2);
        assert_eq!(requests[3]["_source"], json!(["id"]));
        assert_eq!(requests[3]["query"], query);
    }

    #[tokio::test]
    async fn test_no_hits_means_one_request() {
        let client = MockSearch::new([json!({"hits": {"total": 0, "hits": []}})]);
        let documents = search_all(&client, &json!({}), &[], 1000).await.unwrap();
        assert!(documents.is_empty());
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_capped_total_is_rejected() {
        let capped = json!({"hits": {"total": {"value": 10000, "relation": "gte"}, "hits": []}});
        let client = MockSearch::new([capped]);
        let err = search_all(&client, &json!({}), &[], 1000).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse(_)));
        assert_eq!(client.requests().len(), 1);
    }
}
