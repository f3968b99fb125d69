//! Markup detection for fetched content

/// How many leading characters are inspected for a root tag
const SNIFF_CHARS: usize = 100;

/// Kind of a fetched payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// HTML that should go through extraction and conversion
    Markup,
    /// Anything else; passed through as text
    Other,
}

/// Decide whether fetched text is markup
///
/// First match wins:
/// 1. the first 100 characters contain `<html` (any case)
/// 2. the declared content type is an HTML media type
/// 3. no content type was declared at all
///
/// Servers that omit Content-Type are assumed to serve HTML.
pub fn classify(raw_text: &str, declared_content_type: Option<&str>) -> ContentKind {
    let head: String = raw_text.chars().take(SNIFF_CHARS).collect();
    if head.to_lowercase().contains("<html") {
        return ContentKind::Markup;
    }

    match declared_content_type.map(str::trim) {
        None | Some("") => ContentKind::Markup,
        Some(ct) if is_markup_media_type(ct) => ContentKind::Markup,
        Some(_) => ContentKind::Other,
    }
}

fn is_markup_media_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    ct_lower.contains("text/html") || ct_lower.contains("application/xhtml")
}
