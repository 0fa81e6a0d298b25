//! Retrieval client for whole-index scans
//!
//! This module produces the complete record set of one index:
//!
//! 1. **PageSource**: a cursor yielding pages of records until exhausted
//! 2. **ScrollCursor**: the backend scroll API behind `PageSource`
//! 3. **ProgressTracker**: optional progress bar while pages arrive
//!
//! [`SearchClient`] ties them together behind the [`RecordSource`] trait,
//! which is what the export service depends on.
//!
//! Mid-scan failures are never suppressed: a partial record set is an
//! error, not a result.

pub mod progress;
pub mod scroll;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::connection::SearchConnection;
use crate::error::{Result, RetrievalError};

pub use progress::ProgressTracker;
pub use scroll::ScrollCursor;

/// One document's payload: field name to JSON value, schema-free
pub type Record = Map<String, Value>;

/// Every record of one index, in backend iteration order
pub type RecordSet = Vec<Record>;

/// Anything that can produce the full contents of an index
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Retrieve every document of `index`
    ///
    /// # Arguments
    /// * `index` - Index to scan
    ///
    /// # Returns
    /// * `Result<RecordSet>` - All records, or the first error encountered
    async fn load_all(&self, index: &str) -> Result<RecordSet>;
}

/// Trait for paging through a result set
#[async_trait]
pub trait PageSource: Send {
    /// Fetch the next page of records
    ///
    /// # Returns
    /// * `Result<Option<Vec<Record>>>` - Next page, or None if exhausted
    async fn next_batch(&mut self) -> Result<Option<Vec<Record>>>;

    /// Exact document count reported by the backend, once known
    fn reported_total(&self) -> Option<u64>;

    /// Release server-side resources held by the cursor
    async fn close(&mut self) -> Result<()>;
}

/// Drain a page source into a record set
///
/// Fails with [`RetrievalError::Incomplete`] when the backend reported an
/// exact total that does not match what was retrieved.
pub async fn drain_pages(source: &mut dyn PageSource, tracker: &ProgressTracker) -> Result<RecordSet> {
    let scanned = scan_pages(source, tracker).await;
    tracker.finish();
    let records = scanned?;

    if let Some(expected) = source.reported_total() {
        let retrieved = records.len() as u64;
        if expected != retrieved {
            return Err(RetrievalError::Incomplete { expected, retrieved }.into());
        }
    }

    Ok(records)
}

async fn scan_pages(source: &mut dyn PageSource, tracker: &ProgressTracker) -> Result<RecordSet> {
    let mut records = RecordSet::new();
    let mut pages = 0u32;

    while let Some(batch) = source.next_batch().await? {
        pages += 1;
        if pages == 1 {
            if let Some(total) = source.reported_total() {
                tracker.set_total(total);
            }
        }
        records.extend(batch);
        tracker.update(records.len() as u64);

        if pages % 10 == 0 {
            debug!("Progress: {} documents retrieved ({} pages)", records.len(), pages);
        }
    }
    Ok(records)
}

/// Client retrieving whole indices from the search backend
pub struct SearchClient {
    connection: SearchConnection,
    page_size: u32,
    keep_alive: String,
    show_progress: bool,
}

impl SearchClient {
    /// Connect to the backend described by `config`
    ///
    /// Fails with `ConnectionError` if the health probe does not pass.
    pub async fn connect(config: &SearchConfig) -> Result<Self> {
        let connection = SearchConnection::connect(config).await?;
        Ok(Self::from_connection(connection, config))
    }

    /// Wrap an existing connection
    pub fn from_connection(connection: SearchConnection, config: &SearchConfig) -> Self {
        Self {
            connection,
            page_size: config.scroll_size,
            keep_alive: config.scroll_keep_alive.clone(),
            show_progress: false,
        }
    }

    /// Show a progress bar while scanning
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Open a scroll cursor over `index`
    pub fn open_scroll(&self, index: &str) -> ScrollCursor {
        ScrollCursor::new(
            self.connection.clone(),
            index,
            self.page_size,
            &self.keep_alive,
        )
    }
}

#[async_trait]
impl RecordSource for SearchClient {
    async fn load_all(&self, index: &str) -> Result<RecordSet> {
        info!("Scanning index '{}' (page size {})", index, self.page_size);

        let mut cursor = self.open_scroll(index);
        let tracker = ProgressTracker::new(self.show_progress);
        let result = drain_pages(&mut cursor, &tracker).await;

        if let Err(e) = cursor.close().await {
            warn!("Failed to release scroll context for '{}': {}", index, e);
        }

        let records = result?;
        info!("Retrieved {} documents from index '{}'", records.len(), index);
        Ok(records)
    }
}
