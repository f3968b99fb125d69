//! Typed node tree built from parsed HTML
//!
//! The scoring pass needs cheap, repeated access to per-element facts
//! (tag kind, aggregated text length, link text, commas, ancestry). The
//! tree flattens the html5ever DOM produced by `scraper` into an arena of
//! [`NodeRecord`]s with those facts precomputed. Records are stored in
//! discovery order, so a parent's index is always lower than its
//! children's.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Elements dropped while building the tree, together with their contents
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "iframe", "svg", "math", "object",
    "embed", "canvas", "link", "meta",
];

/// Elements that are serialized without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Classification of an element by tag name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Html,
    Body,
    Div,
    Paragraph,
    Pre,
    TableCell,
    TableHeader,
    Table,
    Blockquote,
    Section,
    Article,
    Main,
    Heading(u8),
    List,
    ListItem,
    Address,
    Form,
    Anchor,
    Image,
    /// `nav`, `aside`, `header`, `footer`
    Boilerplate,
    Other,
}

impl TagKind {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "html" => TagKind::Html,
            "body" => TagKind::Body,
            "div" => TagKind::Div,
            "p" => TagKind::Paragraph,
            "pre" => TagKind::Pre,
            "td" => TagKind::TableCell,
            "th" => TagKind::TableHeader,
            "table" => TagKind::Table,
            "blockquote" => TagKind::Blockquote,
            "section" => TagKind::Section,
            "article" => TagKind::Article,
            "main" => TagKind::Main,
            "h1" => TagKind::Heading(1),
            "h2" => TagKind::Heading(2),
            "h3" => TagKind::Heading(3),
            "h4" => TagKind::Heading(4),
            "h5" => TagKind::Heading(5),
            "h6" => TagKind::Heading(6),
            "ul" | "ol" | "dl" => TagKind::List,
            "li" | "dd" | "dt" => TagKind::ListItem,
            "address" => TagKind::Address,
            "form" => TagKind::Form,
            "a" => TagKind::Anchor,
            "img" => TagKind::Image,
            "nav" | "aside" | "header" | "footer" => TagKind::Boilerplate,
            _ => TagKind::Other,
        }
    }

    /// Elements that stop a `div` from being treated as a paragraph
    pub(crate) fn is_block_content(self) -> bool {
        matches!(
            self,
            TagKind::Blockquote
                | TagKind::List
                | TagKind::Div
                | TagKind::Image
                | TagKind::Paragraph
                | TagKind::Pre
                | TagKind::Table
        )
    }
}

/// A child slot of an element, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Child<'a> {
    Element(usize),
    Text(&'a str),
}

/// One element of the tree with its aggregated text statistics
#[derive(Debug, Clone)]
pub(crate) struct NodeRecord<'a> {
    pub(crate) name: &'a str,
    pub(crate) kind: TagKind,
    pub(crate) attrs: Vec<(&'a str, &'a str)>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<Child<'a>>,
    pub(crate) depth: usize,
    /// Whitespace-collapsed text length of the subtree
    pub(crate) text_len: usize,
    /// Portion of `text_len` inside anchors
    pub(crate) link_text_len: usize,
    /// Commas in the subtree text
    pub(crate) commas: usize,
    pub(crate) has_block_descendant: bool,
}

impl<'a> NodeRecord<'a> {
    fn new(element: ElementRef<'a>, parent: Option<usize>, depth: usize) -> Self {
        let value = element.value();
        let name = value.name();
        Self {
            name,
            kind: TagKind::from_name(name),
            attrs: value.attrs().collect(),
            parent,
            children: Vec::new(),
            depth,
            text_len: 0,
            link_text_len: 0,
            commas: 0,
            has_block_descendant: false,
        }
    }

    /// Attribute value by name
    pub(crate) fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    /// `class` and `id` joined, lowercased, for pattern matching
    pub(crate) fn class_and_id(&self) -> String {
        let class = self.attr("class").unwrap_or("");
        let id = self.attr("id").unwrap_or("");
        format!("{class} {id}").to_lowercase()
    }

    /// Fraction of the text that sits inside links
    pub(crate) fn link_density(&self) -> f64 {
        if self.text_len == 0 {
            0.0
        } else {
            self.link_text_len as f64 / self.text_len as f64
        }
    }
}

/// The tree exceeded the configured element ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TooManyNodes(pub(crate) usize);

/// Arena of element records rooted at the document element
#[derive(Debug)]
pub(crate) struct NodeTree<'a> {
    nodes: Vec<NodeRecord<'a>>,
}

impl<'a> NodeTree<'a> {
    /// Build the tree for a parsed document
    ///
    /// `max_nodes == 0` means no ceiling.
    pub(crate) fn build(doc: &'a Html, max_nodes: usize) -> Result<Self, TooManyNodes> {
        let root = doc.root_element();
        let mut nodes = vec![NodeRecord::new(root, None, 0)];
        let mut stack = vec![(root, 0usize)];

        while let Some((element, idx)) = stack.pop() {
            let depth = nodes[idx].depth + 1;
            for child in element.children() {
                match child.value() {
                    Node::Text(text) => {
                        let text: &'a str = text;
                        let record = &mut nodes[idx];
                        record.text_len += collapsed_len(text);
                        record.commas += text.chars().filter(|c| matches!(c, ',' | '，')).count();
                        record.children.push(Child::Text(text));
                    }
                    Node::Element(el) => {
                        if SKIPPED_TAGS.contains(&el.name()) {
                            continue;
                        }
                        let Some(child_el) = ElementRef::wrap(child) else {
                            continue;
                        };
                        let child_idx = nodes.len();
                        if max_nodes > 0 && child_idx >= max_nodes {
                            return Err(TooManyNodes(max_nodes));
                        }
                        nodes.push(NodeRecord::new(child_el, Some(idx), depth));
                        nodes[idx].children.push(Child::Element(child_idx));
                        stack.push((child_el, child_idx));
                    }
                    _ => {}
                }
            }
        }

        // Children always follow their parent, so a reverse sweep sees
        // every subtree complete before folding it into the parent.
        for idx in (1..nodes.len()).rev() {
            if nodes[idx].kind == TagKind::Anchor {
                nodes[idx].link_text_len = nodes[idx].text_len;
            }
            let Some(parent) = nodes[idx].parent else {
                continue;
            };
            let (text_len, link_text_len, commas) = (
                nodes[idx].text_len,
                nodes[idx].link_text_len,
                nodes[idx].commas,
            );
            let is_block = nodes[idx].kind.is_block_content() || nodes[idx].has_block_descendant;

            let parent = &mut nodes[parent];
            parent.text_len += text_len;
            parent.link_text_len += link_text_len;
            parent.commas += commas;
            parent.has_block_descendant |= is_block;
        }

        Ok(Self { nodes })
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get(&self, idx: usize) -> &NodeRecord<'a> {
        &self.nodes[idx]
    }

    /// Index of the first `body` element, if any
    pub(crate) fn body(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.kind == TagKind::Body)
    }

    /// Element children of a node, in document order
    pub(crate) fn element_children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx].children.iter().filter_map(|child| match child {
            Child::Element(i) => Some(*i),
            Child::Text(_) => None,
        })
    }

    /// Ancestors of a node, nearest first
    pub(crate) fn ancestors(&self, idx: usize) -> Ancestors<'_, 'a> {
        Ancestors {
            tree: self,
            next: self.nodes[idx].parent,
        }
    }

    /// Whitespace-collapsed text of a subtree
    pub(crate) fn text(&self, idx: usize) -> String {
        let mut raw = String::new();
        let mut stack = vec![Child::Element(idx)];
        while let Some(child) = stack.pop() {
            match child {
                Child::Text(text) => raw.push_str(text),
                Child::Element(i) => {
                    if !matches!(self.nodes[i].kind, TagKind::Anchor | TagKind::Other) {
                        raw.push(' ');
                    }
                    stack.extend(self.nodes[i].children.iter().rev().copied());
                }
            }
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Serialize a subtree as HTML, leaving out nodes rejected by `keep`
    pub(crate) fn write_html(&self, idx: usize, out: &mut String, keep: &dyn Fn(usize) -> bool) {
        enum Step<'s> {
            Open(usize),
            Close(&'s str),
            Text(&'s str),
        }

        let mut stack = vec![Step::Open(idx)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(text) => escape_text(text, out),
                Step::Close(name) => {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                Step::Open(i) => {
                    if !keep(i) {
                        continue;
                    }
                    let record = &self.nodes[i];
                    out.push('<');
                    out.push_str(record.name);
                    for (key, value) in &record.attrs {
                        out.push(' ');
                        out.push_str(key);
                        out.push_str("=\"");
                        escape_attr(value, out);
                        out.push('"');
                    }
                    out.push('>');
                    if VOID_TAGS.contains(&record.name) {
                        continue;
                    }
                    stack.push(Step::Close(record.name));
                    for child in record.children.iter().rev() {
                        stack.push(match child {
                            Child::Element(c) => Step::Open(*c),
                            Child::Text(t) => Step::Text(t),
                        });
                    }
                }
            }
        }
    }
}

/// Iterator over a node's ancestors
pub(crate) struct Ancestors<'t, 'a> {
    tree: &'t NodeTree<'a>,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.tree.nodes[current].parent;
        Some(current)
    }
}

/// Length of `s` with every whitespace run counted as one character
pub(crate) fn collapsed_len(s: &str) -> usize {
    let mut len = 0;
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                len += 1;
                in_space = true;
            }
        } else {
            len += 1;
            in_space = false;
        }
    }
    len
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}
