//! Error handling module for dump jobs.
//!
//! Every pipeline stage has its own error kind so the caller can tell a
//! broken connection from a failed scan, a bad encoding, or a rejected
//! upload:
//! - [`ConnectionError`]: backend unreachable at connect time
//! - [`RetrievalError`]: failure mid-scan
//! - [`SerializationError`]: table could not be encoded
//! - [`UploadError`]: object store refused or dropped the upload
//! - [`ConfigError`]: startup configuration problems
//!
//! # Example
//!
//! ```rust,no_run
//! use cloud_storage_dump::error::{DumpError, Result};
//!
//! fn report(result: Result<()>) {
//!     if let Err(DumpError::InvalidFormat(tag)) = result {
//!         eprintln!("unsupported format: {tag}");
//!     }
//! }
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, DumpError, Result, RetrievalError, SerializationError,
    UploadError,
};
