//! Export module: whole-index dumps to object storage
//!
//! An export runs as a strict sequence:
//!
//! 1. **ExportJob** validates the index name and format tag
//! 2. a [`RecordSource`](crate::retrieval::RecordSource) returns every record
//! 3. [`Table`] gives the records a common column set
//! 4. the format's [`TableWriter`] encodes the table into a scratch directory
//! 5. a [`BlobStorage`](crate::storage::BlobStorage) publishes the file
//!
//! These steps are orchestrated by the [`ExportService`].
//!
//! # Example
//!
//! ```no_run
//! # async fn demo(config: cloud_storage_dump::Config) -> cloud_storage_dump::Result<()> {
//! use cloud_storage_dump::export::ExportService;
//! use cloud_storage_dump::retrieval::SearchClient;
//! use cloud_storage_dump::storage::GcsStorage;
//!
//! let source = SearchClient::connect(&config.search).await?;
//! let storage = GcsStorage::connect(&config.storage).await?;
//! let service = ExportService::new(Box::new(source), Box::new(storage));
//! let report = service.export_to_storage("orders", "json").await?;
//! println!("{}", report.public_url);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod format;
pub mod table;
pub mod writers;

pub use coordinator::{ExportJob, ExportReport, ExportService};
pub use format::FormatTag;
pub use table::Table;
pub use writers::TableWriter;
