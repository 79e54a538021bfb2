// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names what went wrong and where. Parsing and rendering
//! never produce these: only configuration, transport, traversal and
//! content-file operations can fail.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Remote API failures as a typed vocabulary.
///
/// Confluence and Jira report errors through HTTP status codes with loosely
/// structured bodies, so the status is the reliable signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlassianErrorCode {
    /// Credentials missing, invalid or expired
    Unauthorized,
    /// Credentials valid but lacking permission for this resource
    Forbidden,
    /// The requested page, space or issue does not exist
    NotFound,
    /// Request rejected as malformed (bad JQL, invalid fields)
    BadRequest,
    /// Version conflict, typically a stale page version on update
    Conflict,
    /// Rate limit exceeded
    RateLimited,
    /// Server-side failure
    ServerError(u16),
    /// Any other status
    HttpStatus(u16),
}

impl AtlassianErrorCode {
    /// Classifies an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError(status),
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError(_))
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for AtlassianErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Conflict => write!(f, "conflict"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ServerError(code) => write!(f, "server_error_{}", code),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("No {platform} site named '{alias}' is configured")]
    UnknownSite { platform: String, alias: String },

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Remote API returned an error ({code}) for {url}: {message}")]
    RemoteService {
        code: AtlassianErrorCode,
        message: String,
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Remote fetch failed after retrieving {retrieved} page(s): {source}")]
    RemoteFetch {
        retrieved: usize,
        #[source]
        source: Box<AppError>,
    },

    #[error("Traversal stopped at the {limit}-page limit; more pages exist")]
    TraversalLimitExceeded { limit: usize },

    #[error("Traversal cancelled after retrieving {retrieved} page(s)")]
    Cancelled { retrieved: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    ContentFile(#[from] ContentFileError),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Output delivery failed: {}", failures.join(", "))]
    DeliveryFailed { failures: Vec<String> },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// Whether the transport should retry the request that produced this error.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect(),
            AppError::RemoteService { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// The remote error code, looking through traversal wrappers.
    pub fn remote_code(&self) -> Option<&AtlassianErrorCode> {
        match self {
            AppError::RemoteService { code, .. } => Some(code),
            AppError::RemoteFetch { source, .. } => source.remote_code(),
            _ => None,
        }
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(err: std::fmt::Error) -> Self {
        AppError::InternalError {
            message: "Formatting error".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Content-file lifecycle failures.
///
/// Raised by allocation, reads and writes. Finalization never raises.
#[derive(Error, Debug)]
pub enum ContentFileError {
    #[error("Failed to prepare content directory {path}: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content file not found: {0}")]
    NotFound(PathBuf),

    #[error("File path must be within content directory {dir}: {path}")]
    OutsideContentDir { path: PathBuf, dir: PathBuf },
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
