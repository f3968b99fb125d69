//! Windowing of long documents
//!
//! Indices and lengths count characters, so a window never splits a
//! multi-byte sequence.

/// Returned instead of content when a window starts past the end
pub const NO_MORE_CONTENT: &str = "<error>No more content available.</error>";

/// Instruction appended to a window when more content remains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    /// Where the next window starts
    pub next_start_index: usize,
}

impl std::fmt::Display for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\n\n<error>Content truncated. Call the fetch tool with a start_index of {} to get more content.</error>",
            self.next_start_index
        )
    }
}

/// One window of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedOutput {
    pub slice: String,
    pub continuation: Option<Continuation>,
}

impl PaginatedOutput {
    fn exhausted() -> Self {
        Self {
            slice: NO_MORE_CONTENT.to_string(),
            continuation: None,
        }
    }

    /// True when the window contained nothing
    pub fn is_exhausted(&self) -> bool {
        self.continuation.is_none() && self.slice == NO_MORE_CONTENT
    }

    /// Window text followed by the continuation instruction, if any
    pub fn render(&self) -> String {
        match &self.continuation {
            Some(continuation) => format!("{}{}", self.slice, continuation),
            None => self.slice.clone(),
        }
    }
}

/// Cut the window `[start_index, start_index + max_length)` out of `text`
///
/// A window that is empty or whitespace-only yields [`NO_MORE_CONTENT`].
/// A continuation is attached only when the window was cut short of the
/// end of the text.
pub fn paginate(text: &str, start_index: usize, max_length: usize) -> PaginatedOutput {
    let total = text.chars().count();
    if start_index >= total {
        return PaginatedOutput::exhausted();
    }

    let slice: String = text.chars().skip(start_index).take(max_length).collect();
    if slice.trim().is_empty() {
        return PaginatedOutput::exhausted();
    }

    let taken = slice.chars().count();
    let remaining = total - start_index;
    let continuation = (taken == max_length && taken < remaining).then(|| Continuation {
        next_start_index: start_index + taken,
    });

    PaginatedOutput {
        slice,
        continuation,
    }
}
