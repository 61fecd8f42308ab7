//! HTTP client for an Elasticsearch-compatible `_search` endpoint.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use logstat_config::IndexConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// Anything that can answer a search request body with a response body.
///
/// Implemented over HTTP by [`IndexClient`]; tests substitute canned
/// responses.
#[async_trait]
pub trait Search: Send + Sync {
    async fn search(&self, body: &Value) -> Result<Value>;
}

/// Issues `POST {url}/{index}/_search` requests with JSON bodies.
///
/// ```no_run
/// use logstat_config::IndexConfig;
/// use logstat_index::{IndexClient, Search};
/// use serde_json::json;
///
/// # async fn example() -> logstat_index::error::Result<()> {
/// let client = IndexClient::new(&IndexConfig::default())?;
/// let response = client.search(&json!({"size": 0})).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct IndexClient {
    http: reqwest::Client,
    search_url: String,
}

impl IndexClient {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            http,
            search_url: search_url(&config.url, &config.name),
        })
    }
}

fn search_url(base: &str, index: &str) -> String {
    format!("{}/{}/_search", base.trim_end_matches('/'), urlencoding::encode(index))
}

#[async_trait]
impl Search for IndexClient {
    #[instrument(skip_all, fields(url = %self.search_url, status))]
    async fn search(&self, body: &Value) -> Result<Value> {
        let response = self.http.post(&self.search_url).json(body).send().await.or_raise(|| ErrorKind::Unavailable)?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        if !status.is_success() {
            // The body usually explains what was wrong with the query.
            let reason = response.text().await.unwrap_or_default();
            tracing::debug!(%reason, "Search request rejected");
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        response.json().await.or_raise(|| ErrorKind::InvalidResponse("body is not JSON"))
    }
}
