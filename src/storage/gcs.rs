//! Google Cloud Storage backend
//!
//! Uses the JSON API directly: a bucket probe at construction and simple
//! media uploads streamed from the artifact file.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{ConnectionError, Result, UploadError};

use super::auth::{ServiceAccountKey, TokenProvider};
use super::{BlobStorage, public_url};

/// Bucket handle on Google Cloud Storage
pub struct GcsStorage {
    client: Client,
    endpoint: String,
    public_base: String,
    bucket: String,
    tokens: TokenProvider,
}

impl GcsStorage {
    /// Load credentials and verify the bucket is reachable
    ///
    /// # Arguments
    /// * `config` - Storage configuration
    ///
    /// # Returns
    /// * `Result<Self>` - Ready handle, `ConfigError` for bad credentials or
    ///   `UploadError` if the bucket cannot be reached
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let key = ServiceAccountKey::from_file(config.credentials_path()?)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConnectionError::Client(e.to_string()))?;
        let tokens = TokenProvider::new(key, client.clone())?;

        let storage = Self {
            client,
            endpoint: config.endpoint().to_string(),
            public_base: config.public_base().to_string(),
            bucket: config.bucket()?.to_string(),
            tokens,
        };
        storage.probe_bucket().await?;
        info!(
            "Using bucket '{}' as {}",
            storage.bucket,
            storage.tokens.client_email()
        );
        Ok(storage)
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL a blob of this bucket resolves to
    pub fn public_url(&self, blob_name: &str) -> String {
        public_url(&self.public_base, &self.bucket, blob_name)
    }

    async fn probe_bucket(&self) -> Result<()> {
        let unavailable = |reason: String| UploadError::BucketUnavailable {
            bucket: self.bucket.clone(),
            reason,
        };

        let token = self.tokens.token().await?;
        let url = format!(
            "{}/storage/v1/b/{}",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("status {}: {}", status.as_u16(), body)).into());
        }
        debug!("Bucket '{}' is reachable", self.bucket);
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for GcsStorage {
    async fn upload(&self, file: &Path, blob_name: &str, content_type: &str) -> Result<String> {
        let handle = tokio::fs::File::open(file).await?;
        let length = handle.metadata().await?.len();
        let token = self.tokens.token().await?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(blob_name)
        );
        debug!("Uploading {} ({} bytes) as {}", file.display(), length, blob_name);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(handle)))
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        check_status(response).await?;

        Ok(self.public_url(blob_name))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Rejected {
        status: status.as_u16(),
        body,
    }
    .into())
}
