//! Connection management for the search backend
//!
//! This module owns the HTTP client used to talk to an Elasticsearch
//! compatible REST API:
//! - Connection establishment with a health probe (`GET /`)
//! - Optional basic authentication
//! - Request building shared by the scroll cursor
//!
//! A connection is only handed out after the probe succeeds, so callers
//! never start a scan against a backend that is down or refusing them.

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use tracing::info;

use crate::config::SearchConfig;
use crate::error::{ConnectionError, Result};

/// Validated connection to the search backend
#[derive(Debug, Clone)]
pub struct SearchConnection {
    /// HTTP client instance
    client: Client,

    /// Base URL, e.g. `http://localhost:9200`
    base_url: String,

    /// Basic-auth pair, if configured
    credentials: Option<(String, String)>,
}

/// Subset of the backend's root endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterInfo {
    /// Cluster name
    #[serde(default)]
    pub cluster_name: Option<String>,

    /// Version block
    #[serde(default)]
    pub version: Option<VersionInfo>,
}

/// Backend version information
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionInfo {
    /// Version number, e.g. `8.13.4`
    #[serde(default)]
    pub number: Option<String>,
}

impl SearchConnection {
    /// Open a connection and verify it with a health probe
    ///
    /// # Arguments
    /// * `config` - Search backend configuration
    ///
    /// # Returns
    /// * `Result<Self>` - Connected instance, or `ConnectionError` if the
    ///   backend is unreachable or rejects the probe
    pub async fn connect(config: &SearchConfig) -> Result<Self> {
        let credentials = config
            .credentials()?
            .map(|(user, pass)| (user.to_string(), pass.to_string()));
        let base_url = config.base_url()?;
        reqwest::Url::parse(&base_url)
            .map_err(|e| ConnectionError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConnectionError::Client(e.to_string()))?;

        let connection = Self {
            client,
            base_url,
            credentials,
        };

        let info = connection.probe().await?;
        info!(
            "Successfully connected to server: {} (cluster: {}, version: {}, auth: {})",
            connection.base_url,
            info.cluster_name.as_deref().unwrap_or("unknown"),
            info.version
                .as_ref()
                .and_then(|v| v.number.as_deref())
                .unwrap_or("unknown"),
            if connection.is_authenticated() { "basic" } else { "none" },
        );

        Ok(connection)
    }

    /// Base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry basic authentication
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Build a request against a backend path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path starting with `/`
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// Perform the health probe
    async fn probe(&self) -> Result<ClusterInfo> {
        let response = self
            .request(Method::GET, "/")
            .send()
            .await
            .map_err(|e| ConnectionError::Unreachable {
                host: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Rejected {
                host: self.base_url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        // The probe only needs a 2xx; the body is informational.
        Ok(response.json::<ClusterInfo>().await.unwrap_or_default())
    }
}
