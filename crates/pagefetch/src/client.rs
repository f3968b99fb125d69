//! Fetch pipeline for PageFetch
//!
//! Sequences retrieval, classification, extraction, conversion and
//! pagination into a single outcome. Only retrieval and request validation
//! can fail; extraction and pagination edge cases are rendered as inline
//! markers.

use crate::classify::{classify, ContentKind};
use crate::convert::html_to_markdown_with_base;
use crate::error::FetchError;
use crate::extract::extract;
use crate::paginate::paginate;
use crate::retriever::{check_prefixes, validate_url, FetchResult, HttpRetriever, Retriever};
use crate::types::{ContentFormat, FetchRequest, FetchResponse};
use crate::MAX_LENGTH_LIMIT;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Rendered in place of content when no primary content could be isolated
pub const EXTRACTION_FAILED: &str = "<error>Page failed to be simplified from HTML</error>";

/// Fetch options that can be configured via tool builder
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Custom fetch deadline (30 seconds when unset)
    pub timeout: Option<Duration>,
    /// Allow list of URL prefixes
    pub allow_prefixes: Vec<String>,
    /// Block list of URL prefixes
    pub block_prefixes: Vec<String>,
    /// Honor the `raw` request option
    pub enable_raw: bool,
}

impl FetchOptions {
    /// HTTP retriever configured from these options
    pub fn retriever(&self) -> HttpRetriever {
        let mut retriever = HttpRetriever::new();
        if let Some(ref ua) = self.user_agent {
            retriever = retriever.with_user_agent(ua.clone());
        }
        if let Some(timeout) = self.timeout {
            retriever = retriever.with_timeout(timeout);
        }
        retriever
    }
}

/// Fetch a URL and return the response
///
/// Raw passthrough is enabled. For custom options, use
/// [`fetch_with_options`].
pub async fn fetch(req: FetchRequest) -> Result<FetchResponse, FetchError> {
    let options = FetchOptions {
        enable_raw: true,
        ..Default::default()
    };
    fetch_with_options(req, options).await
}

/// Fetch a URL with custom options over HTTP
pub async fn fetch_with_options(
    req: FetchRequest,
    options: FetchOptions,
) -> Result<FetchResponse, FetchError> {
    let retriever = options.retriever();
    fetch_with_retriever(req, &options, &retriever).await
}

/// Run the pipeline with a caller-supplied retriever
pub async fn fetch_with_retriever<R: Retriever + ?Sized>(
    req: FetchRequest,
    options: &FetchOptions,
    retriever: &R,
) -> Result<FetchResponse, FetchError> {
    let url = validate_url(&req.url)?;
    check_prefixes(url.as_str(), &options.allow_prefixes, &options.block_prefixes)?;

    let max_length = req.effective_max_length();
    if max_length == 0 || max_length > MAX_LENGTH_LIMIT {
        return Err(FetchError::InvalidMaxLength(max_length));
    }
    let start_index = req.effective_start_index();

    debug!(url = %url, retriever = retriever.name(), "Retrieving");
    let fetched = retriever.retrieve(&url).await?;

    let raw = req.wants_raw() && options.enable_raw;
    let rendered = render(&fetched, raw);

    let window = paginate(&rendered.text, start_index, max_length);
    debug!(
        url = %fetched.final_url,
        chars = rendered.text.chars().count(),
        start_index,
        max_length,
        exhausted = window.is_exhausted(),
        "Paginated"
    );

    let content = format!(
        "{}Contents of {}:\n{}",
        rendered.prefix,
        fetched.final_url,
        window.render()
    );

    Ok(FetchResponse {
        url: fetched.final_url,
        content_type: fetched.declared_content_type,
        format: rendered.format,
        content,
    })
}

/// Text ready for pagination plus the prefix announcing how it was produced
struct Rendered {
    prefix: String,
    text: String,
    format: ContentFormat,
}

fn render(fetched: &FetchResult, raw: bool) -> Rendered {
    let kind = classify(&fetched.raw_text, fetched.declared_content_type.as_deref());
    debug!(?kind, raw, "Classified");

    if raw || kind == ContentKind::Other {
        let content_type = fetched
            .declared_content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or("unknown");
        return Rendered {
            prefix: format!(
                "Content type {content_type} cannot be simplified to markdown, but here is the raw content:\n"
            ),
            text: fetched.raw_text.clone(),
            format: ContentFormat::Raw,
        };
    }

    let extracted = extract(&fetched.raw_text);
    let text = if extracted.extraction_succeeded {
        let base = Url::parse(&fetched.final_url).ok();
        html_to_markdown_with_base(&extracted.body, base.as_ref())
    } else {
        warn!(url = %fetched.final_url, "Could not isolate primary content");
        EXTRACTION_FAILED.to_string()
    };

    Rendered {
        prefix: String::new(),
        text,
        format: ContentFormat::Markdown,
    }
}
