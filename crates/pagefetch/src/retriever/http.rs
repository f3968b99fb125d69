//! HTTP retriever
//!
//! Fetches http/https URLs with reqwest, following redirects and bounding
//! the whole exchange (request and body) by a single deadline.

use crate::error::FetchError;
use crate::retriever::{FetchResult, Retriever};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Upper bound on a whole fetch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of redirects followed within one fetch
const MAX_REDIRECTS: usize = 10;

const ACCEPT_VALUE: &str = "text/html, application/xhtml+xml, text/plain, */*;q=0.8";

/// reqwest-backed [`Retriever`]
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    user_agent: String,
    timeout: Duration,
}

impl HttpRetriever {
    /// Create a retriever with the default user agent and timeout
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the fetch deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::ClientBuild)
    }

    async fn fetch_inner(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let client = self.build_client()?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url.as_str(), self.timeout))?;

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let declared_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = read_body(response, url.as_str(), self.timeout).await?;
        debug!(url = %final_url, bytes = body.len(), "Body received");

        Ok(FetchResult {
            final_url,
            raw_text: String::from_utf8_lossy(&body).into_owned(),
            declared_content_type,
        })
    }
}

impl Default for HttpRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn retrieve(&self, url: &Url) -> Result<FetchResult, FetchError> {
        match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

/// Read the full response body
async fn read_body(
    response: reqwest::Response,
    url: &str,
    timeout: Duration,
) -> Result<Bytes, FetchError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => body.extend_from_slice(&bytes),
            Err(e) => {
                error!("Error reading body chunk from {}: {}", url, e);
                return Err(FetchError::from_reqwest(e, url, timeout));
            }
        }
    }

    Ok(Bytes::from(body))
}
