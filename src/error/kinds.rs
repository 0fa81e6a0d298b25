use std::{fmt, io};

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Top-level error type for a dump job.
///
/// Each variant corresponds to one pipeline stage. A stage error keeps its
/// kind all the way up to the caller.
#[derive(Debug)]
pub enum DumpError {
    /// Search backend unreachable or rejected the health probe.
    Connection(ConnectionError),

    /// Format tag outside the supported set.
    InvalidFormat(String),

    /// Index name that would not address exactly one collection.
    InvalidIndex(String),

    /// Failure while scanning the collection.
    Retrieval(RetrievalError),

    /// Failure while encoding the table to the target format.
    Serialization(SerializationError),

    /// Failure talking to the object store.
    Upload(UploadError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Backend could not be reached at all.
    Unreachable { host: String, reason: String },

    /// Backend answered the health probe with a non-success status.
    Rejected { host: String, status: u16 },

    /// Host/port/scheme do not form a usable URL.
    InvalidEndpoint(String),

    /// HTTP client could not be constructed.
    Client(String),
}

/// Errors raised while scanning an index.
#[derive(Debug)]
pub enum RetrievalError {
    /// Network failure mid-scan.
    Transport(String),

    /// Backend answered a scroll request with an error status.
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    MalformedResponse(String),

    /// Some shards failed to contribute to the scan.
    ShardFailures { successful: u64, skipped: u64, total: u64 },

    /// A hit carried no `_source` payload.
    MissingSource(String),

    /// Retrieved fewer or more documents than the backend reported.
    Incomplete { expected: u64, retrieved: u64 },
}

/// Errors raised by the format serializers.
#[derive(Debug)]
pub enum SerializationError {
    /// CSV encoding failed.
    Csv(String),

    /// JSON encoding failed.
    Json(String),

    /// Spreadsheet encoding failed.
    Spreadsheet(String),
}

/// Object storage errors.
#[derive(Debug)]
pub enum UploadError {
    /// Access token could not be obtained.
    Auth(String),

    /// Bucket probe failed.
    BucketUnavailable { bucket: String, reason: String },

    /// Network failure while uploading.
    Transport(String),

    /// Store answered the upload with an error status.
    Rejected { status: u16, body: String },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Only one half of the username/password pair was supplied.
    PartialCredentials { present: String, missing: String },

    /// Service-account key file unreadable or malformed.
    Credentials(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Connection(e) => write!(f, "Connection error: {e}"),
            DumpError::InvalidFormat(tag) => write!(
                f,
                "Invalid file format '{tag}' (expected one of: csv, json, xlsx)"
            ),
            DumpError::InvalidIndex(msg) => write!(f, "Invalid index: {msg}"),
            DumpError::Retrieval(e) => write!(f, "Retrieval error: {e}"),
            DumpError::Serialization(e) => write!(f, "Serialization error: {e}"),
            DumpError::Upload(e) => write!(f, "Upload error: {e}"),
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable { host, reason } => {
                write!(f, "Can not connect to Elasticsearch server {host}: {reason}")
            }
            ConnectionError::Rejected { host, status } => {
                write!(f, "Elasticsearch server {host} rejected health probe with status {status}")
            }
            ConnectionError::InvalidEndpoint(msg) => write!(f, "Invalid endpoint: {msg}"),
            ConnectionError::Client(msg) => write!(f, "Failed to build HTTP client: {msg}"),
        }
    }
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalError::Transport(msg) => write!(f, "Scroll request failed: {msg}"),
            RetrievalError::Status { status, body } => {
                write!(f, "Scroll request returned status {status}: {body}")
            }
            RetrievalError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            RetrievalError::ShardFailures {
                successful,
                skipped,
                total,
            } => write!(
                f,
                "Scroll request has only succeeded on {successful} (+{skipped} skipped) shards out of {total}"
            ),
            RetrievalError::MissingSource(id) => {
                write!(f, "Document '{id}' has no _source payload")
            }
            RetrievalError::Incomplete {
                expected,
                retrieved,
            } => write!(
                f,
                "Scan incomplete: backend reported {expected} documents, retrieved {retrieved}"
            ),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::Csv(msg) => write!(f, "CSV: {msg}"),
            SerializationError::Json(msg) => write!(f, "JSON: {msg}"),
            SerializationError::Spreadsheet(msg) => write!(f, "XLSX: {msg}"),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Auth(msg) => write!(f, "Failed to obtain access token: {msg}"),
            UploadError::BucketUnavailable { bucket, reason } => {
                write!(f, "Bucket '{bucket}' is not available: {reason}")
            }
            UploadError::Transport(msg) => write!(f, "Upload request failed: {msg}"),
            UploadError::Rejected { status, body } => {
                write!(f, "Upload rejected with status {status}: {body}")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::PartialCredentials { present, missing } => {
                write!(f, "{present} is set but {missing} is not; set both or neither")
            }
            ConfigError::Credentials(msg) => write!(f, "Invalid service account key: {msg}"),
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Connection(e) => Some(e),
            DumpError::Retrieval(e) => Some(e),
            DumpError::Serialization(e) => Some(e),
            DumpError::Upload(e) => Some(e),
            DumpError::Config(e) => Some(e),
            DumpError::Io(e) => Some(e),
            DumpError::InvalidFormat(_) | DumpError::InvalidIndex(_) => None,
        }
    }
}
impl std::error::Error for ConnectionError {}
impl std::error::Error for RetrievalError {}
impl std::error::Error for SerializationError {}
impl std::error::Error for UploadError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DumpError ========================= */

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

impl From<ConnectionError> for DumpError {
    fn from(err: ConnectionError) -> Self {
        DumpError::Connection(err)
    }
}

impl From<RetrievalError> for DumpError {
    fn from(err: RetrievalError) -> Self {
        DumpError::Retrieval(err)
    }
}

impl From<SerializationError> for DumpError {
    fn from(err: SerializationError) -> Self {
        DumpError::Serialization(err)
    }
}

impl From<UploadError> for DumpError {
    fn from(err: UploadError) -> Self {
        DumpError::Upload(err)
    }
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}
