//! Core types for PageFetch

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default window size in characters
pub const DEFAULT_MAX_LENGTH: usize = 5000;

/// How the returned content was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Primary content extracted and converted to markdown
    #[default]
    Markdown,
    /// Fetched text passed through unmodified
    Raw,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentFormat::Markdown => write!(f, "markdown"),
            ContentFormat::Raw => write!(f, "raw"),
        }
    }
}

/// Request to fetch a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchRequest {
    /// The URL to fetch (required, must be http:// or https://)
    pub url: String,

    /// Maximum number of characters to return (optional, default 5000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 1000000))]
    pub max_length: Option<usize>,

    /// Start returning content at this character index (optional, default 0).
    /// Use it to continue reading a page that was truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,

    /// Return the page content unmodified, without markdown simplification (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
}

impl FetchRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the window size
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the window start
    pub fn start_index(mut self, start_index: usize) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Request raw passthrough
    pub fn raw(mut self) -> Self {
        self.raw = Some(true);
        self
    }

    /// Window size with the default applied
    pub fn effective_max_length(&self) -> usize {
        self.max_length.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    /// Window start with the default applied
    pub fn effective_start_index(&self) -> usize {
        self.start_index.unwrap_or(0)
    }

    /// Check if raw passthrough is requested
    pub fn wants_raw(&self) -> bool {
        self.raw.unwrap_or(false)
    }
}

/// Response from a successful fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub url: String,

    /// Content-Type header value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// How the content was produced
    pub format: ContentFormat,

    /// The text payload: source header, content window and, when the page
    /// continues, an instruction naming the next start_index
    pub content: String,
}

/// Outcome of a single tool call
///
/// Exactly one of success text or failure message, flagged by `is_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text payload or human-readable failure message
    pub text: String,
    /// True if the call failed
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful output
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Failed output
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            is_error: true,
        }
    }
}
