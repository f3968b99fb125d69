//! PageFetch - paginated web page fetching for language-model tools
//!
//! Given a URL, PageFetch retrieves the resource, isolates the primary
//! readable content of HTML pages, converts it to Markdown and returns one
//! bounded window of the result. When more content remains, the window ends
//! with an instruction naming the `start_index` of the next call.
//!
//! ## Pipeline
//!
//! - [`retriever`] - URL validation and the [`Retriever`] trait ([`HttpRetriever`])
//! - [`classify`] - markup vs. other content
//! - [`extract`] - readability-style primary content isolation
//! - [`convert`] - HTML to Markdown
//! - [`paginate`] - character windows with continuation
//! - [`client`] - the orchestrator tying the stages together
//!
//! ```no_run
//! use pagefetch::{fetch, FetchRequest};
//!
//! # async fn run() -> Result<(), pagefetch::FetchError> {
//! let resp = fetch(FetchRequest::new("https://example.com").max_length(2000)).await?;
//! println!("{}", resp.content);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod convert;
mod dom;
mod error;
pub mod extract;
pub mod paginate;
pub mod retriever;
mod tool;
mod types;

pub use classify::{classify, ContentKind};
pub use client::{fetch, fetch_with_options, fetch_with_retriever, FetchOptions, EXTRACTION_FAILED};
pub use convert::{html_to_markdown, html_to_markdown_with_base};
pub use error::{ErrorKind, FetchError};
pub use extract::{extract, extract_with_options, ExtractOptions, ExtractedContent};
pub use paginate::{paginate, Continuation, PaginatedOutput, NO_MORE_CONTENT};
pub use retriever::{FetchResult, HttpRetriever, Retriever};
pub use tool::{Tool, ToolBuilder};
pub use types::{ContentFormat, FetchRequest, FetchResponse, ToolOutput, DEFAULT_MAX_LENGTH};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "PageFetch/1.0 (Autonomous; +https://github.com/pagefetch/pagefetch)";

/// Largest accepted `max_length`
pub const MAX_LENGTH_LIMIT: usize = 1_000_000;

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Fetches a URL from the internet and extracts its contents as markdown.

- Isolates the main content of HTML pages and drops navigation
- Returns at most max_length characters per call
- Long pages end with an instruction naming the start_index for the next call
- Set raw to get the page content without simplification"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# PageFetch Tool

Fetches a URL from the internet and extracts its contents as markdown.

## Capabilities
- HTTP and HTTPS GET requests, redirects followed
- Main content extraction for HTML pages
- HTML to Markdown conversion
- Character-windowed pagination for long pages
- 30 second timeout per fetch

## Input Parameters
- `url` (required): The URL to fetch (must be http:// or https://)
- `max_length` (optional): Maximum characters to return, 1 to 1000000 (default: 5000)
- `start_index` (optional): Character index to start from (default: 0)
- `raw` (optional): Return the page content without simplification (default: false)

## Output
A text block starting with `Contents of <final url>:` followed by the content
window. Non-HTML content (and raw requests) is returned as-is, preceded by a
line naming its content type.

When more content is available the window ends with:
`<error>Content truncated. Call the fetch tool with a start_index of N to get more content.</error>`

Requesting a start_index past the end returns:
`<error>No more content available.</error>`

Pages whose main content cannot be isolated return:
`<error>Page failed to be simplified from HTML</error>`

## Examples

### Fetch a webpage as markdown
```json
{"url": "https://example.com"}
```

### Continue reading a long page
```json
{"url": "https://example.com/long-article", "start_index": 5000}
```

### Fetch raw HTML
```json
{"url": "https://example.com", "raw": true}
```

## Error Handling
- Invalid URLs and non-http(s) schemes are rejected before fetching
- Non-2xx responses report the status code
- Timeouts and connection failures name the URL
"#;
