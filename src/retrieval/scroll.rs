//! Scroll cursor over a search index
//!
//! Implements [`PageSource`] on top of the backend's scroll API: the first
//! page comes from a `match_all` search that opens a scroll context, every
//! following page from `/_search/scroll` using the latest scroll id, and the
//! context is released once the scan ends.

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::connection::SearchConnection;
use crate::error::{Result, RetrievalError};

use super::{PageSource, Record};

/// Cursor walking every document of one index, page by page
pub struct ScrollCursor {
    connection: SearchConnection,
    index: String,
    page_size: u32,
    keep_alive: String,
    /// Latest scroll id returned by the backend
    scroll_id: Option<String>,
    /// Total reported by the first page when exact
    reported_total: Option<u64>,
    total_fetched: u64,
    pages: u32,
    exhausted: bool,
    released: bool,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    #[serde(rename = "_shards", default)]
    shards: Option<ShardStats>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct ShardStats {
    total: u64,
    successful: u64,
    #[serde(default)]
    skipped: u64,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// `hits.total` is a bare number before 7.x and an object after
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Relation { value: u64, relation: String },
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source", default)]
    source: Option<Record>,
}

impl TotalHits {
    fn exact(&self) -> Option<u64> {
        match self {
            TotalHits::Count(n) => Some(*n),
            TotalHits::Relation { value, relation } if relation == "eq" => Some(*value),
            TotalHits::Relation { .. } => None,
        }
    }
}

impl ScrollCursor {
    /// Create a cursor; no request is sent until the first `next_batch`
    ///
    /// # Arguments
    /// * `connection` - Validated backend connection
    /// * `index` - Index to scan
    /// * `page_size` - Documents per page
    /// * `keep_alive` - Scroll context lifetime between pages, e.g. `5m`
    pub fn new(
        connection: SearchConnection,
        index: &str,
        page_size: u32,
        keep_alive: &str,
    ) -> Self {
        Self {
            connection,
            index: index.to_string(),
            page_size,
            keep_alive: keep_alive.to_string(),
            scroll_id: None,
            reported_total: None,
            total_fetched: 0,
            pages: 0,
            exhausted: false,
            released: false,
        }
    }

    async fn fetch_page(&self) -> Result<ScrollResponse> {
        let request = match (&self.scroll_id, self.pages) {
            (_, 0) => {
                let path = format!(
                    "/{}/_search?scroll={}",
                    urlencoding::encode(&self.index),
                    urlencoding::encode(&self.keep_alive)
                );
                self.connection.request(Method::POST, &path).json(&json!({
                    "query": { "match_all": {} },
                    "size": self.page_size,
                    "sort": ["_doc"],
                    // Exact totals past 10k, needed for the completeness check
                    "track_total_hits": true,
                }))
            }
            (Some(id), _) => self
                .connection
                .request(Method::POST, "/_search/scroll")
                .json(&json!({ "scroll": self.keep_alive, "scroll_id": id })),
            (None, _) => {
                return Err(RetrievalError::MalformedResponse(
                    "backend did not return a scroll id".to_string(),
                )
                .into());
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        response
            .json::<ScrollResponse>()
            .await
            .map_err(|e| RetrievalError::MalformedResponse(e.to_string()).into())
    }

    /// Release the scroll context on the backend
    async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let Some(id) = self.scroll_id.take() else {
            return Ok(());
        };

        let response = self
            .connection
            .request(Method::DELETE, "/_search/scroll")
            .json(&json!({ "scroll_id": [id] }))
            .send()
            .await
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;

        // 404 means the context already expired, which is what we wanted.
        if response.status().as_u16() != 404 {
            check_status(response).await?;
        }
        debug!("Released scroll context for index '{}'", self.index);
        Ok(())
    }
}

#[async_trait]
impl PageSource for ScrollCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<Record>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match self.fetch_page().await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if let Some(shards) = &page.shards {
            if shards.successful + shards.skipped < shards.total {
                self.exhausted = true;
                return Err(RetrievalError::ShardFailures {
                    successful: shards.successful,
                    skipped: shards.skipped,
                    total: shards.total,
                }
                .into());
            }
        }

        if page.scroll_id.is_some() {
            self.scroll_id = page.scroll_id;
        }
        if self.pages == 0 {
            self.reported_total = page.hits.total.as_ref().and_then(TotalHits::exact);
        }
        self.pages += 1;

        if page.hits.hits.is_empty() {
            debug!(
                "Scroll over '{}' exhausted after {} documents",
                self.index, self.total_fetched
            );
            self.exhausted = true;
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(page.hits.hits.len());
        for hit in page.hits.hits {
            match hit.source {
                Some(source) => batch.push(source),
                None => {
                    self.exhausted = true;
                    let id = hit.id.unwrap_or_else(|| "<unknown>".to_string());
                    return Err(RetrievalError::MissingSource(id).into());
                }
            }
        }

        self.total_fetched += batch.len() as u64;
        debug!(
            "Fetched page #{} of {} documents (total: {})",
            self.pages,
            batch.len(),
            self.total_fetched
        );
        Ok(Some(batch))
    }

    fn reported_total(&self) -> Option<u64> {
        self.reported_total
    }

    async fn close(&mut self) -> Result<()> {
        if !self.released {
            self.exhausted = true;
            self.release().await?;
            info!(
                "Closed scroll over '{}' after fetching {} documents",
                self.index, self.total_fetched
            );
        }
        Ok(())
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        if !self.released && self.scroll_id.is_some() {
            debug!(
                "ScrollCursor for '{}' dropped without release; context expires after {}",
                self.index, self.keep_alive
            );
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RetrievalError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}
