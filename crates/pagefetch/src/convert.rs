//! HTML to markdown conversion
//!
//! Walks the parsed node tree and maps structure to markdown: ATX headings,
//! `-` bullets, numbered lists, backtick fences, `_em_`, `**strong**`,
//! inline links and images. Output depends only on the input tree, so the
//! same markup always renders to the same bytes.

use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// Elements whose content never reaches the output
const SKIP_TAGS: &[&str] = &[
    "head", "title", "script", "style", "noscript", "template", "iframe", "svg", "math",
    "object", "embed", "canvas", "meta", "link", "button", "input", "select", "textarea",
];

/// Elements rendered as paragraph-separated blocks
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "nav",
    "aside",
    "figure",
    "figcaption",
    "address",
    "details",
    "summary",
    "dl",
    "dt",
    "dd",
    "form",
    "fieldset",
    "caption",
    "center",
    "body",
];

/// Convert HTML to markdown
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with_base(html, None)
}

/// Convert HTML to markdown, resolving relative link and image targets
/// against `base_url`
pub fn html_to_markdown_with_base(html: &str, base_url: Option<&Url>) -> String {
    let fragment = Html::parse_fragment(html);
    let converter = Converter { base_url };
    let raw = converter.render(fragment.root_element());
    clean_markdown(&raw)
}

/// Pending work of the tree walk
enum Step<'a> {
    Open(ElementRef<'a>),
    Text(&'a str),
    Close,
}

/// An element whose children are still being rendered
struct Frame<'a> {
    element: ElementRef<'a>,
    /// Rendered inline and block content
    out: String,
    /// Raw content of `li` children, for lists
    items: Vec<String>,
    /// Raw content of `td`/`th` children, for rows
    cells: Vec<String>,
    /// Collected rows, for tables and table sections
    rows: Vec<Vec<String>>,
}

impl<'a> Frame<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self {
            element,
            out: String::new(),
            items: Vec::new(),
            cells: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn name(&self) -> &'a str {
        self.element.value().name()
    }
}

/// What a finished element hands to its parent
enum Rendered {
    Text(String),
    Item(String),
    Cell(String),
    Row(Vec<String>),
    Rows(Vec<Vec<String>>),
}

struct Converter<'u> {
    base_url: Option<&'u Url>,
}

impl Converter<'_> {
    /// Render the children of `root`
    ///
    /// The walk keeps its own stack of open elements, so nesting depth is
    /// bounded by memory rather than by the call stack.
    fn render(&self, root: ElementRef<'_>) -> String {
        let mut frames = vec![Frame::new(root)];
        let mut steps = vec![Step::Close];
        push_children(&mut steps, root);

        while let Some(step) = steps.pop() {
            match step {
                Step::Text(text) => {
                    if let Some(frame) = frames.last_mut() {
                        deliver(frame, Rendered::Text(collapse_whitespace(text)));
                    }
                }
                Step::Open(element) => {
                    let name = element.value().name();
                    if SKIP_TAGS.contains(&name) {
                        continue;
                    }
                    if let Some(leaf) = self.render_leaf(element) {
                        if let Some(parent) = frames.last_mut() {
                            deliver(parent, Rendered::Text(leaf));
                        }
                        continue;
                    }
                    frames.push(Frame::new(element));
                    steps.push(Step::Close);
                    push_children(&mut steps, element);
                }
                Step::Close => {
                    let Some(frame) = frames.pop() else {
                        break;
                    };
                    let parent_name = frames.last().map(Frame::name);
                    let rendered = self.finish(frame, parent_name);
                    match frames.last_mut() {
                        Some(parent) => deliver(parent, rendered),
                        None => {
                            return match rendered {
                                Rendered::Text(text) => text,
                                _ => String::new(),
                            }
                        }
                    }
                }
            }
        }
        String::new()
    }

    /// Elements rendered without walking their children
    fn render_leaf(&self, element: ElementRef<'_>) -> Option<String> {
        let rendered = match element.value().name() {
            "br" => "\n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "pre" => render_code_block(element),
            "code" | "kbd" | "samp" | "tt" => render_code_span(element),
            "img" => self.render_image(element),
            _ => return None,
        };
        Some(rendered)
    }

    fn finish(&self, frame: Frame<'_>, parent_name: Option<&str>) -> Rendered {
        let name = frame.name();
        let in_list = matches!(parent_name, Some("ul" | "ol"));
        let text = match name {
            "li" if in_list => return Rendered::Item(frame.out),
            "td" | "th" if parent_name == Some("tr") => return Rendered::Cell(frame.out),
            "tr" => return Rendered::Row(frame.cells),
            "thead" | "tbody" | "tfoot" => return Rendered::Rows(frame.rows),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = inline(&frame.out);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level), text)
                }
            }
            "ul" => render_list(frame.element, &frame.items, false),
            "ol" => render_list(frame.element, &frame.items, true),
            "li" => block(&format!("- {}", frame.out.trim())),
            "em" | "i" | "cite" | "var" => wrap_inline(&frame.out, "_"),
            "strong" | "b" => wrap_inline(&frame.out, "**"),
            "a" => self.render_link(frame.element, &frame.out),
            "blockquote" => render_blockquote(&frame.out),
            "table" => render_table(&frame.rows),
            _ if BLOCK_TAGS.contains(&name) => block(&frame.out),
            _ => frame.out,
        };
        Rendered::Text(text)
    }

    fn render_link(&self, anchor: ElementRef<'_>, content: &str) -> String {
        let text = inline(content);
        let href = anchor.value().attr("href").map(str::trim).unwrap_or("");
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return text;
        }
        if text.is_empty() {
            return String::new();
        }

        let target = escape_target(&self.resolve(href));
        match anchor.value().attr("title").map(str::trim) {
            Some(title) if !title.is_empty() => {
                format!("[{}]({} \"{}\")", text, target, title.replace('"', "\\\""))
            }
            _ => format!("[{}]({})", text, target),
        }
    }

    fn render_image(&self, image: ElementRef<'_>) -> String {
        let src = image.value().attr("src").map(str::trim).unwrap_or("");
        if src.is_empty() || src.starts_with("data:") {
            return String::new();
        }
        let alt = image.value().attr("alt").map(inline).unwrap_or_default();
        format!("![{}]({})", alt, escape_target(&self.resolve(src)))
    }

    fn resolve(&self, target: &str) -> String {
        match self.base_url {
            Some(base) => base
                .join(target)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| target.to_string()),
            None => target.to_string(),
        }
    }
}

/// Queue an element's children so they pop in document order
fn push_children<'a>(steps: &mut Vec<Step<'a>>, element: ElementRef<'a>) {
    let start = steps.len();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => steps.push(Step::Text(text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    steps.push(Step::Open(child_el));
                }
            }
            _ => {}
        }
    }
    steps[start..].reverse();
}

/// Hand a finished child to its parent frame
fn deliver(parent: &mut Frame<'_>, rendered: Rendered) {
    match rendered {
        Rendered::Item(item) => parent.items.push(item),
        Rendered::Cell(cell) => parent.cells.push(cell),
        Rendered::Row(row) => parent.rows.push(row),
        Rendered::Rows(rows) => parent.rows.extend(rows),
        Rendered::Text(text) => match parent.name() {
            // Stray nested lists belong to the preceding item
            "ul" | "ol" => {
                if text.trim().is_empty() {
                    return;
                }
                match parent.items.last_mut() {
                    Some(last) => last.push_str(&text),
                    None => parent.items.push(text),
                }
            }
            "table" | "thead" | "tbody" | "tfoot" | "tr" => {}
            _ => append(&mut parent.out, &text),
        },
    }
}

fn render_list(list: ElementRef<'_>, items: &[String], ordered: bool) -> String {
    let start = if ordered {
        list.value()
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
    } else {
        1
    };

    let rendered: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, content)| {
            let marker = if ordered {
                format!("{}. ", start + i)
            } else {
                "- ".to_string()
            };
            let content = content.trim();
            let content = if content.contains("```") {
                content.to_string()
            } else {
                collapse_blank_lines(content)
            };
            prefix_lines(&content, &marker, &" ".repeat(marker.len()))
        })
        .collect();

    if rendered.is_empty() {
        String::new()
    } else {
        block(&rendered.join("\n"))
    }
}

fn render_blockquote(content: &str) -> String {
    let content = clean_markdown(content);
    if content.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = content
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect();
    block(&quoted.join("\n"))
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    // Single-column tables are layout, not data
    if columns == 1 {
        return rows.iter().flatten().map(|cell| block(cell)).collect();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        let mut cells: Vec<String> = row
            .iter()
            .map(|cell| inline(cell).replace('|', "\\|"))
            .collect();
        cells.resize(columns, String::new());
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    block(&lines.join("\n"))
}

fn escape_target(target: &str) -> String {
    target.replace('(', "\\(").replace(')', "\\)")
}

fn render_code_block(pre: ElementRef<'_>) -> String {
    let code: String = pre.text().collect();
    let code = code.strip_suffix('\n').unwrap_or(&code);
    let language = code_language(pre).unwrap_or_default();
    let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
    format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
}

fn render_code_span(code: ElementRef<'_>) -> String {
    let text: String = code.text().collect();
    if text.is_empty() {
        return String::new();
    }
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

/// Language from a `language-*` or `lang-*` class on the block or its code child
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    let code_child = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code");

    [Some(pre), code_child]
        .into_iter()
        .flatten()
        .flat_map(|el| el.value().classes())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
}

fn longest_backtick_run(s: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Surround with paragraph breaks; empty content renders nothing
fn block(content: &str) -> String {
    let content = content.trim_matches(|c: char| c == '\n' || c == ' ');
    if content.is_empty() {
        String::new()
    } else {
        format!("\n\n{content}\n\n")
    }
}

/// Wrap emphasized content in a delimiter, keeping surrounding spaces outside
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{delimiter}{trimmed}{delimiter}{trail}")
}

/// Flatten to a single line
fn inline(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Append a rendered piece, dropping spaces at line starts and doubled spaces
fn append(out: &mut String, piece: &str) {
    if out.is_empty() || out.ends_with('\n') {
        out.push_str(piece.trim_start_matches(' '));
    } else if out.ends_with(' ') {
        out.push_str(piece.strip_prefix(' ').unwrap_or(piece));
    } else {
        out.push_str(piece);
    }
}

fn prefix_lines(content: &str, first: &str, rest: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{first}{line}")
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{rest}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_lines(s: &str) -> String {
    s.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize rendered markdown
///
/// Outside code fences: trailing whitespace is trimmed and blank-line runs
/// collapse to one. Fenced content is kept verbatim.
fn clean_markdown(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;
    let mut blank_run = 0;

    for line in raw.lines() {
        let trimmed = line.trim();
        match fence {
            Some(open) => {
                if trimmed == open {
                    fence = None;
                    lines.push(trimmed);
                } else {
                    lines.push(line);
                }
                continue;
            }
            None => {
                if trimmed.starts_with("```") {
                    let run = trimmed.len() - trimmed.trim_start_matches('`').len();
                    fence = Some(&trimmed[..run]);
                    blank_run = 0;
                    lines.push(line.trim_end());
                    continue;
                }
            }
        }

        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n").trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings() {
        let md = html_to_markdown("<h1>Title</h1><h2>Subtitle</h2><h6>Small</h6>");
        assert_eq!(md, "# Title\n\n## Subtitle\n\n###### Small");
    }

    #[test]
    fn test_paragraphs() {
        let md = html_to_markdown("<p>First paragraph</p>\n\n<p>Second   paragraph</p>");
        assert_eq!(md, "First paragraph\n\nSecond paragraph");
    }

    #[test]
    fn test_unordered_list() {
        let md = html_to_markdown("<ul>\n  <li>Item 1</li>\n  <li>Item 2</li>\n</ul>");
        assert_eq!(md, "- Item 1\n- Item 2");
    }

    #[test]
    fn test_ordered_and_nested_lists() {
        let md = html_to_markdown(
            "<ol start='3'><li>Three<ul><li>Nested</li></ul></li><li>Four</li></ol>",
        );
        assert_eq!(md, "3. Three\n   - Nested\n4. Four");
    }

    #[test]
    fn test_emphasis() {
        let md = html_to_markdown("<p><strong>bold</strong> and <em>italic</em> and <b> spaced </b>text</p>");
        assert_eq!(md, "**bold** and _italic_ and **spaced** text");
    }

    #[test]
    fn test_code_block_and_inline_code() {
        let md = html_to_markdown(
            "<p>Call <code>main()</code> first.</p><pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}\n</code></pre>",
        );
        assert_eq!(
            md,
            "Call `main()` first.\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```"
        );
    }

    #[test]
    fn test_code_block_keeps_blank_lines() {
        let md = html_to_markdown("<pre>a\n\n\n\nb   </pre>");
        assert_eq!(md, "```\na\n\n\n\nb   \n```");
    }

    #[test]
    fn test_code_block_with_backticks_uses_longer_fence() {
        let md = html_to_markdown("<pre>```\nnested\n```</pre>");
        assert_eq!(md, "````\n```\nnested\n```\n````");
    }

    #[test]
    fn test_links() {
        let md = html_to_markdown(
            "<p>See <a href=\"https://example.com/docs\" title=\"Docs\">the docs</a> or <a href=\"#top\">top</a>.</p>",
        );
        assert_eq!(
            md,
            "See [the docs](https://example.com/docs \"Docs\") or top."
        );
    }

    #[test]
    fn test_relative_links_resolved() {
        let base = Url::parse("https://example.com/blog/post").unwrap();
        let md = html_to_markdown_with_base(
            "<p><a href=\"../about\">About</a> <img src=\"/logo.png\" alt=\"Logo\"></p>",
            Some(&base),
        );
        assert_eq!(
            md,
            "[About](https://example.com/about) ![Logo](https://example.com/logo.png)"
        );
    }

    #[test]
    fn test_link_target_parentheses_escaped() {
        let md = html_to_markdown("<a href=\"https://en.wikipedia.org/wiki/Rust_(language)\">Rust</a>");
        assert_eq!(md, "[Rust](https://en.wikipedia.org/wiki/Rust_\\(language\\))");
    }

    #[test]
    fn test_blockquote() {
        let md = html_to_markdown("<blockquote><p>Quoted line</p><p>Second</p></blockquote>");
        assert_eq!(md, "> Quoted line\n>\n> Second");
    }

    #[test]
    fn test_table() {
        let md = html_to_markdown(
            "<table><thead><tr><th>Name</th><th>Value</th></tr></thead><tbody><tr><td>a|b</td><td>1</td></tr></tbody></table>",
        );
        assert_eq!(md, "| Name | Value |\n| --- | --- |\n| a\\|b | 1 |");
    }

    #[test]
    fn test_skips_script_and_style() {
        let md = html_to_markdown(
            "<p>Before</p><script>alert('bad');</script><style>p { color: red }</style><p>After</p>",
        );
        assert_eq!(md, "Before\n\nAfter");
    }

    #[test]
    fn test_entities_decoded() {
        let md = html_to_markdown("<p>Tom &amp; Jerry &lt;3 &quot;quoted&quot; &mdash; end</p>");
        assert_eq!(md, "Tom & Jerry <3 \"quoted\" — end");
    }

    #[test]
    fn test_horizontal_rule_and_breaks() {
        let md = html_to_markdown("<p>one<br>two</p><hr><p>three</p>");
        assert_eq!(md, "one\ntwo\n\n---\n\nthree");
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let html = "<div><h2>Title</h2><p>Some <em>text</em> with <a href='/x'>links</a>.</p><ul><li>a</li><li>b</li></ul><pre>code</pre></div>";
        let first = html_to_markdown(html);
        for _ in 0..10 {
            assert_eq!(html_to_markdown(html), first);
        }
    }

    #[test]
    fn test_deeply_nested_markup() {
        let depth = 10_000;
        let html = format!(
            "{}deep text{}",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        assert_eq!(html_to_markdown(&html), "deep text");

        let html = format!(
            "{}<li>leaf</li>{}",
            "<ul><li>".repeat(200),
            "</li></ul>".repeat(200)
        );
        assert!(html_to_markdown(&html).contains("- leaf"));
    }

    #[test]
    fn test_nested_table_stays_in_its_cell() {
        let md = html_to_markdown(
            "<table><tr><td>outer</td><td><table><tr><td>x</td><td>y</td></tr></table></td></tr></table>",
        );
        assert!(md.starts_with("| outer |"));
        assert!(md.contains("x"));
    }

    #[test]
    fn test_clean_markdown() {
        assert_eq!(clean_markdown("\n\na  \n\n\n\nb\n\n"), "a\n\nb");
    }
}
