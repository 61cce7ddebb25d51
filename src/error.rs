//! Error taxonomy for catalog listing and artifact downloads

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the catalog or persisting artifacts
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 401/403: fatal for the affected username, never retried
    #[error("authentication rejected (HTTP {status})")]
    Authentication { status: u16 },

    /// 404: end of results on listing, a failed artifact on download
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Timeouts, connection resets, 5xx and 429
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Writing the target failed (permissions, disk space)
    #[error("filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed listing page or a pagination loop
    #[error("malformed catalog response: {0}")]
    PaginationProtocol(String),

    /// Any other non-success response
    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The request could not be built or followed (bad URL, redirect loop)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, url: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication {
                status: status.as_u16(),
            },
            404 => Self::NotFound {
                url: url.to_string(),
            },
            429 => Self::TransientNetwork(format!("HTTP 429 from {}", url)),
            s if status.is_server_error() => {
                Self::TransientNetwork(format!("HTTP {} from {}", s, url))
            }
            s => Self::UnexpectedStatus {
                status: s,
                url: url.to_string(),
            },
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return Self::from_status(status, &url);
        }
        if err.is_decode() {
            return Self::PaginationProtocol(err.to_string());
        }
        if err.is_builder() || err.is_redirect() {
            return Self::InvalidRequest(err.to_string());
        }
        Self::TransientNetwork(err.to_string())
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Default retry predicate: only transient network failures are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Stable label used in failure records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::NotFound { .. } => "not_found",
            Self::TransientNetwork(_) => "transient_network",
            Self::Filesystem { .. } => "filesystem",
            Self::PaginationProtocol(_) => "pagination_protocol",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}
