//! Export coordinator for orchestrating dump jobs
//!
//! Brings together the record source, the format writers and the blob
//! store. Each job gets its own scratch directory which is released on every
//! exit path, including serializer and upload failures.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{DumpError, Result};
use crate::retrieval::RecordSource;
use crate::storage::BlobStorage;

use super::format::FormatTag;
use super::table::Table;

/// Prefix of per-job scratch directories
pub const SCRATCH_PREFIX: &str = "cloud-storage-dump-";

/// One dump request: which index, in which format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    index: String,
    format: FormatTag,
}

/// Result of a completed export
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Blob name inside the bucket
    pub blob_name: String,
    /// Publicly resolvable URL of the blob
    pub public_url: String,
    /// Number of records exported
    pub records: usize,
    /// Artifact size in bytes
    pub bytes: u64,
    /// Time taken for the whole job
    pub elapsed_ms: u64,
}

impl ExportJob {
    /// Validate a job request
    ///
    /// The format is checked first, then the index name. Neither check
    /// touches the network.
    ///
    /// # Arguments
    /// * `index` - Index to dump
    /// * `format` - Format tag (`csv`, `json` or `xlsx`)
    pub fn new(index: &str, format: &str) -> Result<Self> {
        let format: FormatTag = format.parse()?;
        validate_index(index)?;
        Ok(Self {
            index: index.to_string(),
            format,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    /// `<index>.<extension>`
    pub fn blob_name(&self) -> String {
        format!("{}.{}", self.index, self.format.extension())
    }
}

/// Reject names that do not address exactly one index
fn validate_index(index: &str) -> Result<()> {
    if index.trim().is_empty() {
        return Err(DumpError::InvalidIndex("index name is empty".to_string()));
    }
    if index.contains(['*', ',']) {
        return Err(DumpError::InvalidIndex(format!(
            "'{}' would match more than one index",
            index
        )));
    }
    if index.chars().any(char::is_whitespace) {
        return Err(DumpError::InvalidIndex(format!(
            "'{}' contains whitespace",
            index
        )));
    }
    if index.starts_with('_') {
        return Err(DumpError::InvalidIndex(format!(
            "'{}' is a reserved name",
            index
        )));
    }
    Ok(())
}

/// Coordinator for export operations
pub struct ExportService {
    /// Where records come from
    source: Box<dyn RecordSource>,
    /// Where artifacts go
    storage: Box<dyn BlobStorage>,
    /// Parent of per-job scratch directories; system temp dir when None
    scratch_root: Option<PathBuf>,
}

impl ExportService {
    /// Create a new export service
    pub fn new(source: Box<dyn RecordSource>, storage: Box<dyn BlobStorage>) -> Self {
        Self {
            source,
            storage,
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Dump `index` in `format` and publish it
    ///
    /// The format is validated before the backend is contacted, so an
    /// unknown tag never costs a scan.
    ///
    /// # Returns
    /// * `Result<ExportReport>` - Blob name and public URL, or the error of
    ///   the stage that failed
    pub async fn export_to_storage(&self, index: &str, format: &str) -> Result<ExportReport> {
        let job = ExportJob::new(index, format)?;
        self.run(&job).await
    }

    /// Execute a validated job
    pub async fn run(&self, job: &ExportJob) -> Result<ExportReport> {
        let start_time = Instant::now();
        info!("Starting export of '{}' as {}", job.index(), job.format());

        let records = self.source.load_all(job.index()).await?;
        let record_count = records.len();
        let table = Table::from_records(records);
        debug!(
            "Converted {} records into {} columns",
            table.len(),
            table.width()
        );

        let scratch = self.acquire_scratch()?;
        let outcome = self.publish(&table, job, scratch.path()).await;
        release_scratch(scratch);
        let (public_url, bytes) = outcome?;

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Export completed: {} records, {} bytes, {} ms",
            record_count, bytes, elapsed_ms
        );
        info!("Uploaded {} to {}", job.blob_name(), public_url);

        Ok(ExportReport {
            blob_name: job.blob_name(),
            public_url,
            records: record_count,
            bytes,
            elapsed_ms,
        })
    }

    /// Serialize into `dir` and upload
    async fn publish(&self, table: &Table, job: &ExportJob, dir: &Path) -> Result<(String, u64)> {
        let blob_name = job.blob_name();
        let path = dir.join(&blob_name);

        job.format().writer().write(table, &path)?;
        let bytes = tokio::fs::metadata(&path).await?.len();
        debug!("Serialized {} ({} bytes)", path.display(), bytes);

        let public_url = self
            .storage
            .upload(&path, &blob_name, job.format().content_type())
            .await?;
        Ok((public_url, bytes))
    }

    fn acquire_scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Acquired scratch directory {}", dir.path().display());
        Ok(dir)
    }
}

/// Remove a scratch directory and everything in it
fn release_scratch(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => debug!("Released scratch directory {}", path.display()),
        Err(e) => warn!("Failed to remove scratch directory {}: {}", path.display(), e),
    }
}
