//! Cloud Storage Dump Library
//!
//! Core functionality of the `cloud-storage-dump` tool: scan a whole
//! Elasticsearch index, write it as CSV, JSON or XLSX and publish the file to
//! a Google Cloud Storage bucket.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: Elasticsearch connection and health probe
//! - `error`: Error types and handling
//! - `export`: Tabular conversion, format writers and job coordination
//! - `retrieval`: Scroll-based retrieval of whole indices
//! - `storage`: Blob storage backends
//!
//! # Example
//!
//! ```no_run
//! use cloud_storage_dump::{
//!     config::Config, export::ExportService, retrieval::SearchClient, storage::GcsStorage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env()?;
//!
//!     let source = SearchClient::connect(&config.search).await?;
//!     let storage = GcsStorage::connect(&config.storage).await?;
//!     let service = ExportService::new(Box::new(source), Box::new(storage));
//!
//!     let report = service.export_to_storage("orders", "csv").await?;
//!     println!("{}", report.public_url);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod retrieval;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{DumpError, Result};
pub use export::{ExportJob, ExportReport, ExportService, FormatTag};
pub use retrieval::SearchClient;
pub use storage::GcsStorage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
