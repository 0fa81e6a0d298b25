//! Object storage for published dumps
//!
//! The export service only needs one operation from a store: put a file
//! under a blob name and get back a public URL. [`BlobStorage`] is that
//! seam; [`GcsStorage`] implements it for Google Cloud Storage.

pub mod auth;
pub mod gcs;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use gcs::GcsStorage;

/// Trait abstracting over blob storage backends
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload `file` as `blob_name`, overwriting any existing blob
    ///
    /// # Arguments
    /// * `file` - Local artifact to upload
    /// * `blob_name` - Destination name inside the bucket
    /// * `content_type` - MIME type stored with the blob
    ///
    /// # Returns
    /// * `Result<String>` - Publicly resolvable URL of the blob
    async fn upload(&self, file: &Path, blob_name: &str, content_type: &str) -> Result<String>;
}

/// Public URL of a blob: `<base>/<bucket>/<percent-encoded blob>`
pub fn public_url(base: &str, bucket: &str, blob_name: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        bucket,
        urlencoding::encode(blob_name)
    )
}
