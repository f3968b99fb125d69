//! Retrieval of remote resources
//!
//! Design: the pipeline only sees the [`Retriever`] trait, so the HTTP
//! implementation can be swapped for an in-memory one in tests or by
//! embedders. URL validation happens here, before any retriever runs.

mod http;

pub use http::HttpRetriever;

use crate::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// Result of a single retrieval
///
/// Immutable; dropped once the pipeline has produced its output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// URL the content was finally served from, after redirects
    pub final_url: String,
    /// Body decoded as text
    pub raw_text: String,
    /// Content-Type header value, if the server sent one
    pub declared_content_type: Option<String>,
}

/// Trait for components that fetch a URL's content
///
/// Implementations perform exactly one logical fetch per call (redirects
/// included) and never retry.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Fetch the resource at `url`
    ///
    /// `url` has already passed [`validate_url`].
    async fn retrieve(&self, url: &Url) -> Result<FetchResult, FetchError>;
}

/// Parse and validate a caller-supplied URL
///
/// Only absolute http and https URLs are accepted.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::MissingUrl);
    }

    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(FetchError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("{trimmed} has no host")));
    }

    Ok(url)
}

/// Check a URL against allow and block prefix lists
///
/// An empty allow list allows everything; the block list always applies.
pub fn check_prefixes(
    url: &str,
    allow_prefixes: &[String],
    block_prefixes: &[String],
) -> Result<(), FetchError> {
    if !allow_prefixes.is_empty()
        && !allow_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    {
        return Err(FetchError::BlockedUrl);
    }

    if block_prefixes
        .iter()
        .any(|prefix| url.starts_with(prefix.as_str()))
    {
        return Err(FetchError::BlockedUrl);
    }

    Ok(())
}
