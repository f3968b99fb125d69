//! Primary content extraction
//!
//! A readability-style heuristic: paragraph-like elements distribute a
//! score to their ancestors, ancestors are weighted by tag and class/id,
//! and the best scoring subtree (plus qualifying siblings) is taken as the
//! page's readable content. The selected region is returned as cleaned
//! HTML for the markdown converter.
//!
//! Two passes run. The strict pass drops unlikely candidates (navigation,
//! sidebars, comment sections, ...) and applies class weights; the lenient
//! pass scores the whole document. The first pass whose content reaches
//! the character threshold wins.

use crate::dom::{NodeTree, TagKind, TooManyNodes};
use scraper::Html;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Minimum text length of extracted content
pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

/// Number of top candidates considered when choosing the content root
pub const DEFAULT_NB_TOP_CANDIDATES: usize = 5;

/// Alternative candidates that must share an ancestor for it to be promoted
const MIN_SHARED_CANDIDATES: usize = 3;

/// Paragraph-like elements shorter than this are not scored
const MIN_PARAGRAPH_LEN: usize = 25;

/// How far up a paragraph's score propagates
const SCORE_ANCESTOR_DEPTH: usize = 5;

const CLASS_WEIGHT: f64 = 25.0;

const UNLIKELY_CANDIDATES: &[&str] = &[
    "-ad-",
    "ai2html",
    "banner",
    "breadcrumbs",
    "combx",
    "comment",
    "community",
    "cover-wrap",
    "disqus",
    "extra",
    "footer",
    "gdpr",
    "header",
    "legends",
    "menu",
    "related",
    "remark",
    "replies",
    "rss",
    "shoutbox",
    "sidebar",
    "skyscraper",
    "social",
    "sponsor",
    "supplemental",
    "ad-break",
    "agegate",
    "pagination",
    "pager",
    "popup",
    "yom-remote",
];

const MAYBE_CANDIDATES: &[&str] = &["and", "article", "body", "column", "content", "main", "shadow"];

const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

const POSITIVE_HINTS: &[&str] = &[
    "article", "body", "content", "entry", "hentry", "h-entry", "main", "page", "post", "text",
    "blog", "story",
];

const NEGATIVE_HINTS: &[&str] = &[
    "-ad-",
    "banner",
    "combx",
    "comment",
    "com-",
    "contact",
    "footer",
    "gdpr",
    "masthead",
    "media",
    "meta",
    "outbrain",
    "promo",
    "related",
    "scroll",
    "share",
    "shoutbox",
    "sidebar",
    "skyscraper",
    "sponsor",
    "shopping",
    "tags",
    "widget",
];

/// Tuning knobs of the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Element ceiling; 0 means unlimited
    pub max_elems_to_parse: usize,
    /// Number of top candidates evaluated
    pub nb_top_candidates: usize,
    /// Minimum text length for a successful extraction
    pub char_threshold: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_elems_to_parse: 0,
            nb_top_candidates: DEFAULT_NB_TOP_CANDIDATES,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
        }
    }
}

/// Outcome of extraction
///
/// `extraction_succeeded == false` is not an error: the page simply had no
/// identifiable primary content, and `body` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Cleaned HTML of the primary content region
    pub body: String,
    pub extraction_succeeded: bool,
}

impl ExtractedContent {
    fn failed() -> Self {
        Self {
            body: String::new(),
            extraction_succeeded: false,
        }
    }
}

/// Extract the primary readable content of an HTML document
pub fn extract(markup: &str) -> ExtractedContent {
    extract_with_options(markup, &ExtractOptions::default())
}

/// Extract with explicit tuning
pub fn extract_with_options(markup: &str, options: &ExtractOptions) -> ExtractedContent {
    let doc = Html::parse_document(markup);
    let tree = match NodeTree::build(&doc, options.max_elems_to_parse) {
        Ok(tree) => tree,
        Err(TooManyNodes(limit)) => {
            warn!(limit, "Document exceeds element ceiling, skipping extraction");
            return ExtractedContent::failed();
        }
    };

    for pass in [Pass::STRICT, Pass::LENIENT] {
        if let Some(body) = run_pass(&tree, pass, options) {
            return ExtractedContent {
                body,
                extraction_succeeded: true,
            };
        }
        debug!(?pass, "Extraction pass produced too little content");
    }

    ExtractedContent::failed()
}

#[derive(Debug, Clone, Copy)]
struct Pass {
    strip_unlikely: bool,
    weight_classes: bool,
    clean_conditionally: bool,
}

impl Pass {
    const STRICT: Pass = Pass {
        strip_unlikely: true,
        weight_classes: true,
        clean_conditionally: true,
    };

    const LENIENT: Pass = Pass {
        strip_unlikely: false,
        weight_classes: false,
        clean_conditionally: false,
    };
}

fn run_pass(tree: &NodeTree<'_>, pass: Pass, options: &ExtractOptions) -> Option<String> {
    let mut removed = removed_nodes(tree, pass);
    let mut scores = score_paragraphs(tree, &removed, pass);

    // Links don't count as content
    for (idx, score) in scores.iter_mut().enumerate() {
        if let Some(score) = score {
            *score *= 1.0 - tree.get(idx).link_density();
        }
    }

    let mut candidates: Vec<(usize, f64)> = scores
        .iter()
        .enumerate()
        .filter_map(|(idx, score)| score.map(|s| (idx, s)))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.truncate(options.nb_top_candidates.max(1));

    let fallback_root = tree.body().unwrap_or(0);
    let roots = match candidates.first() {
        Some(&(top, _)) if !matches!(tree.get(top).kind, TagKind::Body | TagKind::Html) => {
            let top = promote_shared_ancestor(tree, &candidates);
            let top = climb_only_children(tree, top);
            let top_score = scores[top].unwrap_or_else(|| initial_score(tree, top, pass));
            debug!(
                tag = tree.get(top).name,
                score = top_score,
                candidates = candidates.len(),
                "Selected content root"
            );
            collect_siblings(tree, top, top_score, &scores, &removed)
        }
        _ => vec![fallback_root],
    };

    if pass.clean_conditionally {
        prune_link_heavy(tree, &roots, &mut removed);
    }

    let text_len = kept_text_len(tree, &roots, &removed);
    if text_len < options.char_threshold {
        debug!(text_len, threshold = options.char_threshold, "Content below threshold");
        return None;
    }

    let keep = |idx: usize| !removed[idx];
    let mut body = String::from("<div>");
    for &root in &roots {
        tree.write_html(root, &mut body, &keep);
    }
    body.push_str("</div>");
    Some(body)
}

/// Mark nodes excluded from scoring and output
///
/// Removal is inherited: a node under a removed node is removed too.
fn removed_nodes(tree: &NodeTree<'_>, pass: Pass) -> Vec<bool> {
    let mut removed = vec![false; tree.len()];
    // Under an article or main element
    let mut in_content = vec![false; tree.len()];
    for idx in 0..tree.len() {
        let (inherited, content) = match tree.get(idx).parent {
            Some(p) => (
                removed[p],
                in_content[p] || matches!(tree.get(p).kind, TagKind::Article | TagKind::Main),
            ),
            None => (false, false),
        };
        in_content[idx] = content;
        removed[idx] = inherited || (pass.strip_unlikely && is_unlikely(tree, idx, content));
    }
    removed
}

fn is_unlikely(tree: &NodeTree<'_>, idx: usize, in_content: bool) -> bool {
    let record = tree.get(idx);
    match record.kind {
        TagKind::Html | TagKind::Body | TagKind::Anchor => return false,
        // A header inside an article is part of the article
        TagKind::Boilerplate if !in_content => return true,
        _ => {}
    }

    if let Some(role) = record.attr("role") {
        if UNLIKELY_ROLES.contains(&role.trim().to_lowercase().as_str()) {
            return true;
        }
    }

    let hints = record.class_and_id();
    UNLIKELY_CANDIDATES.iter().any(|p| hints.contains(p))
        && !MAYBE_CANDIDATES.iter().any(|p| hints.contains(p))
}

fn is_paragraph_like(tree: &NodeTree<'_>, idx: usize) -> bool {
    let record = tree.get(idx);
    match record.kind {
        TagKind::Paragraph | TagKind::Pre | TagKind::TableCell | TagKind::Section => true,
        TagKind::Heading(level) => level >= 2,
        TagKind::Div => !record.has_block_descendant,
        _ => false,
    }
}

/// Score paragraph-like nodes into their ancestors
fn score_paragraphs(tree: &NodeTree<'_>, removed: &[bool], pass: Pass) -> Vec<Option<f64>> {
    let mut scores: Vec<Option<f64>> = vec![None; tree.len()];

    for idx in 0..tree.len() {
        if removed[idx] || !is_paragraph_like(tree, idx) {
            continue;
        }
        let record = tree.get(idx);
        if record.text_len < MIN_PARAGRAPH_LEN {
            continue;
        }

        let content_score =
            1.0 + record.commas as f64 + (record.text_len / 100).min(3) as f64;

        for (level, ancestor) in tree.ancestors(idx).take(SCORE_ANCESTOR_DEPTH).enumerate() {
            // The document element itself is never a candidate
            if tree.get(ancestor).parent.is_none() {
                break;
            }
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                _ => level as f64 * 3.0,
            };
            let score = scores[ancestor].get_or_insert_with(|| initial_score(tree, ancestor, pass));
            *score += content_score / divider;
        }
    }

    scores
}

fn initial_score(tree: &NodeTree<'_>, idx: usize, pass: Pass) -> f64 {
    let base = match tree.get(idx).kind {
        TagKind::Div => 5.0,
        TagKind::Pre | TagKind::TableCell | TagKind::Blockquote => 3.0,
        TagKind::Address | TagKind::List | TagKind::ListItem | TagKind::Form => -3.0,
        TagKind::Heading(_) | TagKind::TableHeader => -5.0,
        _ => 0.0,
    };
    if pass.weight_classes {
        base + class_weight(tree, idx)
    } else {
        base
    }
}

fn class_weight(tree: &NodeTree<'_>, idx: usize) -> f64 {
    let record = tree.get(idx);
    let mut weight = 0.0;
    for value in [record.attr("class"), record.attr("id")].into_iter().flatten() {
        let value = value.to_lowercase();
        if NEGATIVE_HINTS.iter().any(|h| value.contains(h)) {
            weight -= CLASS_WEIGHT;
        }
        if POSITIVE_HINTS.iter().any(|h| value.contains(h)) {
            weight += CLASS_WEIGHT;
        }
    }
    weight
}

/// Promote a common ancestor when several strong candidates live under it
fn promote_shared_ancestor(tree: &NodeTree<'_>, candidates: &[(usize, f64)]) -> usize {
    let (top, top_score) = candidates[0];
    if top_score <= 0.0 {
        return top;
    }

    let alternatives: Vec<usize> = candidates[1..]
        .iter()
        .filter(|(_, score)| score / top_score >= 0.75)
        .map(|(idx, _)| *idx)
        .collect();
    if alternatives.len() < MIN_SHARED_CANDIDATES {
        return top;
    }

    // Alternatives below each ancestor
    let mut shared: HashMap<usize, usize> = HashMap::new();
    for &alt in &alternatives {
        for ancestor in tree.ancestors(alt) {
            *shared.entry(ancestor).or_default() += 1;
        }
    }

    for ancestor in tree.ancestors(top) {
        if matches!(tree.get(ancestor).kind, TagKind::Body | TagKind::Html) {
            break;
        }
        if shared.get(&ancestor).copied().unwrap_or(0) >= MIN_SHARED_CANDIDATES {
            return ancestor;
        }
    }
    top
}

/// A lone child carries no more context than its parent
fn climb_only_children(tree: &NodeTree<'_>, mut top: usize) -> usize {
    while let Some(parent) = tree.get(top).parent {
        if matches!(tree.get(parent).kind, TagKind::Body | TagKind::Html)
            || tree.element_children(parent).count() != 1
        {
            break;
        }
        top = parent;
    }
    top
}

/// The content root plus siblings that look like part of the same article
fn collect_siblings(
    tree: &NodeTree<'_>,
    top: usize,
    top_score: f64,
    scores: &[Option<f64>],
    removed: &[bool],
) -> Vec<usize> {
    let Some(parent) = tree.get(top).parent else {
        return vec![top];
    };

    let threshold = (top_score * 0.2).max(10.0);
    let top_class = tree.get(top).attr("class").unwrap_or("");

    tree.element_children(parent)
        .filter(|&sibling| !removed[sibling])
        .filter(|&sibling| {
            if sibling == top {
                return true;
            }
            let record = tree.get(sibling);

            let bonus = match record.attr("class") {
                Some(class) if !top_class.is_empty() && class == top_class => top_score * 0.2,
                _ => 0.0,
            };
            if let Some(score) = scores[sibling] {
                if score + bonus >= threshold {
                    return true;
                }
            }

            if record.kind != TagKind::Paragraph {
                return false;
            }
            let density = record.link_density();
            let text = tree.text(sibling);
            let len = text.chars().count();
            if len > 80 {
                density < 0.25
            } else {
                len > 0 && density == 0.0 && (text.contains(". ") || text.ends_with('.'))
            }
        })
        .collect()
}

/// Drop link-heavy blocks (share bars, tag clouds, inline menus) inside the content
fn prune_link_heavy(tree: &NodeTree<'_>, roots: &[usize], removed: &mut [bool]) {
    let inside = inside_roots(tree, roots);
    for idx in 0..tree.len() {
        if removed[idx] || !inside[idx] {
            continue;
        }
        if let Some(parent) = tree.get(idx).parent {
            if removed[parent] {
                removed[idx] = true;
                continue;
            }
        }
        let record = tree.get(idx);
        let prunable = match record.kind {
            TagKind::Form => true,
            TagKind::Div | TagKind::List | TagKind::Table | TagKind::Section => {
                record.link_density() > 0.5 && class_weight(tree, idx) < CLASS_WEIGHT
            }
            _ => false,
        };
        if prunable {
            removed[idx] = true;
        }
    }
}

/// Text length of the content roots, less the text of removed descendants
fn kept_text_len(tree: &NodeTree<'_>, roots: &[usize], removed: &[bool]) -> usize {
    let total: usize = roots
        .iter()
        .filter(|&&root| !removed[root])
        .map(|&root| tree.get(root).text_len)
        .sum();
    let inside = inside_roots(tree, roots);
    let dropped: usize = (0..tree.len())
        .filter(|&idx| removed[idx] && inside[idx])
        .filter(|&idx| tree.get(idx).parent.is_some_and(|p| !removed[p]))
        .map(|idx| tree.get(idx).text_len)
        .sum();
    total.saturating_sub(dropped)
}

/// Nodes strictly below one of `roots`
fn inside_roots(tree: &NodeTree<'_>, roots: &[usize]) -> Vec<bool> {
    let mut is_root = vec![false; tree.len()];
    for &root in roots {
        is_root[root] = true;
    }
    let mut inside = vec![false; tree.len()];
    for idx in 0..tree.len() {
        if let Some(parent) = tree.get(idx).parent {
            inside[idx] = is_root[parent] || inside[parent];
        }
    }
    inside
}
