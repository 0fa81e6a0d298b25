//! Configuration management for cloud-storage-dump
//!
//! This module handles loading, parsing, and validating configuration from:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! The resulting [`Config`] is built once at startup and passed down by
//! reference; nothing reads the environment after that.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Destination bucket name.
pub const ENV_BUCKET: &str = "CLOUD_STORAGE_BUCKET";
/// Search backend host.
pub const ENV_SEARCH_HOST: &str = "ELASTICSEARCH_HOST";
/// Search backend port.
pub const ENV_SEARCH_PORT: &str = "ELASTICSEARCH_PORT";
/// Basic-auth username.
pub const ENV_SEARCH_USERNAME: &str = "ELASTICSEARCH_USERNAME";
/// Basic-auth password.
pub const ENV_SEARCH_PASSWORD: &str = "ELASTICSEARCH_PASSWORD";
/// `http` or `https`.
pub const ENV_SEARCH_SCHEME: &str = "ELASTICSEARCH_SCHEME";
/// Service-account key file.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_SCROLL_SIZE: &str = "DUMP_SCROLL_SIZE";
pub const ENV_SCROLL_KEEP_ALIVE: &str = "DUMP_SCROLL_KEEP_ALIVE";
pub const ENV_REQUEST_TIMEOUT: &str = "DUMP_REQUEST_TIMEOUT";
pub const ENV_STORAGE_ENDPOINT: &str = "DUMP_STORAGE_ENDPOINT";
pub const ENV_PUBLIC_BASE: &str = "DUMP_PUBLIC_BASE";
pub const ENV_LOG_LEVEL: &str = "DUMP_LOG_LEVEL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search backend configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Export job configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// URL scheme used to reach the backend
    #[serde(default)]
    pub scheme: Scheme,

    /// Backend host name or address
    #[serde(default)]
    pub host: Option<String>,

    /// Backend HTTP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Basic-auth username (requires `password`)
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password (requires `username`)
    #[serde(default)]
    pub password: Option<String>,

    /// Documents per scroll page
    #[serde(default = "default_scroll_size")]
    pub scroll_size: u32,

    /// How long the backend keeps a scroll context alive between pages
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// URL scheme for the search backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination bucket
    #[serde(default)]
    pub bucket: Option<String>,

    /// Path to the service-account key file
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Storage API base URL
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Base of the public URLs handed back for uploaded blobs
    #[serde(default = "default_public_base")]
    pub public_base: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Export job configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Parent directory for per-job scratch directories (system temp dir when unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Show a progress bar while scanning
    #[serde(default)]
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_scroll_size() -> u32 {
    1000
}

fn default_scroll_keep_alive() -> String {
    "5m".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_storage_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_public_base() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            host: None,
            port: None,
            username: None,
            password: None,
            scroll_size: default_scroll_size(),
            scroll_keep_alive: default_scroll_keep_alive(),
            timeout: default_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            credentials_path: None,
            endpoint: default_storage_endpoint(),
            public_base: default_public_base(),
            timeout: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present, and defaults otherwise.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.display().to_string()).into());
                }
                Self::from_file(p)
            }
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(format!("{}: {}", path.as_ref().display(), e)).into())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cloud-storage-dump")
            .join("config.toml")
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup
    ///
    /// Blank values count as unset.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value for a variable name
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = get(ENV_BUCKET) {
            self.storage.bucket = Some(bucket);
        }
        if let Some(path) = get(ENV_CREDENTIALS) {
            self.storage.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(endpoint) = get(ENV_STORAGE_ENDPOINT) {
            self.storage.endpoint = endpoint;
        }
        if let Some(base) = get(ENV_PUBLIC_BASE) {
            self.storage.public_base = base;
        }
        if let Some(host) = get(ENV_SEARCH_HOST) {
            self.search.host = Some(host);
        }
        if let Some(port) = get(ENV_SEARCH_PORT) {
            self.search.port = Some(parse_value(ENV_SEARCH_PORT, &port)?);
        }
        if let Some(scheme) = get(ENV_SEARCH_SCHEME) {
            self.search.scheme = parse_value(ENV_SEARCH_SCHEME, &scheme)?;
        }
        if let Some(username) = get(ENV_SEARCH_USERNAME) {
            self.search.username = Some(username);
        }
        if let Some(password) = get(ENV_SEARCH_PASSWORD) {
            self.search.password = Some(password);
        }
        if let Some(size) = get(ENV_SCROLL_SIZE) {
            self.search.scroll_size = parse_value(ENV_SCROLL_SIZE, &size)?;
        }
        if let Some(keep_alive) = get(ENV_SCROLL_KEEP_ALIVE) {
            self.search.scroll_keep_alive = keep_alive;
        }
        if let Some(timeout) = get(ENV_REQUEST_TIMEOUT) {
            let secs = parse_value(ENV_REQUEST_TIMEOUT, &timeout)?;
            self.search.timeout = secs;
            self.storage.timeout = secs;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.logging.level = parse_value(ENV_LOG_LEVEL, &level)?;
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Every required value must be present before a job starts.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl SearchConfig {
    /// Validate search backend settings
    pub fn validate(&self) -> Result<()> {
        self.host()?;
        self.port()?;
        self.credentials()?;

        if self.scroll_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.scroll_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.scroll_keep_alive.trim().is_empty() {
            return Err(ConfigError::MissingField("search.scroll_keep_alive".to_string()).into());
        }
        if self.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Backend host
    pub fn host(&self) -> Result<&str> {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingField(ENV_SEARCH_HOST.to_string()).into())
    }

    /// Backend port
    pub fn port(&self) -> Result<u16> {
        self.port
            .ok_or_else(|| ConfigError::MissingField(ENV_SEARCH_PORT.to_string()).into())
    }

    /// Base URL of the backend, without trailing slash
    pub fn base_url(&self) -> Result<String> {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        Ok(format!("{}://{}:{}", scheme, self.host()?, self.port()?))
    }

    /// Basic-auth pair, if configured
    ///
    /// A lone username or password is an error rather than silently
    /// connecting without authentication.
    pub fn credentials(&self) -> Result<Option<(&str, &str)>> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Ok(Some((user, pass))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::PartialCredentials {
                present: ENV_SEARCH_USERNAME.to_string(),
                missing: ENV_SEARCH_PASSWORD.to_string(),
            }
            .into()),
            (None, Some(_)) => Err(ConfigError::PartialCredentials {
                present: ENV_SEARCH_PASSWORD.to_string(),
                missing: ENV_SEARCH_USERNAME.to_string(),
            }
            .into()),
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl StorageConfig {
    /// Validate storage settings
    pub fn validate(&self) -> Result<()> {
        self.bucket()?;
        self.credentials_path()?;
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField(ENV_STORAGE_ENDPOINT.to_string()).into());
        }
        if self.public_base.trim().is_empty() {
            return Err(ConfigError::MissingField(ENV_PUBLIC_BASE.to_string()).into());
        }
        Ok(())
    }

    /// Destination bucket
    pub fn bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConfigError::MissingField(ENV_BUCKET.to_string()).into())
    }

    /// Service-account key file
    pub fn credentials_path(&self) -> Result<&Path> {
        self.credentials_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField(ENV_CREDENTIALS.to_string()).into())
    }

    /// Storage endpoint without trailing slash
    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// Public URL base without trailing slash
    pub fn public_base(&self) -> &str {
        self.public_base.trim_end_matches('/')
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl LogLevel {
    /// Lowercase name, as used in filter directives
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

impl FromStr for Scheme {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(()),
        }
    }
}

fn parse_value<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}
