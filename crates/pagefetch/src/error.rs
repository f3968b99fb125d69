//! Error types for PageFetch

use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network activity
    Validation,
    /// The fetch exceeded its time budget
    Timeout,
    /// Transport-level failure
    Network,
    /// The server answered with a non-2xx status
    HttpStatus,
}

/// Errors that terminate a fetch
///
/// Extraction failures and exhausted pagination are not errors; they are
/// rendered as inline markers in an otherwise successful response.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL scheme is neither http nor https
    #[error("Unsupported URL scheme '{0}': only http and https URLs are supported")]
    UnsupportedScheme(String),

    /// URL is blocked by prefix list
    #[error("Blocked URL: prefix not allowed")]
    BlockedUrl,

    /// max_length outside of the accepted range
    #[error("Invalid max_length {0}: must be between 1 and {}", crate::MAX_LENGTH_LIMIT)]
    InvalidMaxLength(usize),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// The request did not complete within the time budget
    #[error("Failed to fetch {url}: request timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Connection, redirect or body read failure
    #[error("Failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("Failed to fetch {url} - status code {status}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    /// Create an error from a reqwest error raised while fetching `url`
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::MissingUrl
            | FetchError::InvalidUrl(_)
            | FetchError::UnsupportedScheme(_)
            | FetchError::BlockedUrl
            | FetchError::InvalidMaxLength(_) => ErrorKind::Validation,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::ClientBuild(_) | FetchError::Network { .. } => ErrorKind::Network,
            FetchError::HttpStatus { .. } => ErrorKind::HttpStatus,
        }
    }
}
