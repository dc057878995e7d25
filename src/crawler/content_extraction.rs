//! Content extraction functionality for the crawler module
//!
//! Everything here is a pure function over markup: malformed or partial
//! documents degrade to less text, never to an error.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::{trace, warn};

/// Elements whose subtree never contributes readable text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that start and end a line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "caption",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "option",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Failed to parse selector '{}': {:?}", css, e);
            None
        }
    }
}

fn find_body(document: &Html) -> Option<ElementRef<'_>> {
    let selector = parse_selector("body")?;
    document.select(&selector).next()
}

/// Return the serialized `<body>` element of a document
///
/// Returns an empty string when the document has no body.
pub fn extract_body(html: &str) -> String {
    let document = Html::parse_document(html);
    find_body(&document)
        .map(|body| body.html())
        .unwrap_or_default()
}

/// Convert a rendered document into normalized readable text
///
/// Script and style subtrees are dropped, block elements break lines, and the
/// result is trimmed line by line with blank lines removed.
///
/// # Arguments
///
/// * `html` - The rendered document
///
/// # Returns
///
/// Newline-joined text with no blank lines and no surrounding whitespace on any line.
/// The parser synthesizes a `<body>` for fragments and head-only documents, so
/// the empty result for a missing body only happens for frameset documents.
pub fn clean(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(body) = find_body(&document) else {
        return String::new();
    };

    let raw = visible_text(body);
    let cleaned = normalize_lines(&raw);
    trace!(
        "Cleaned {} bytes of markup into {} bytes of text",
        html.len(),
        cleaned.len()
    );
    cleaned
}

/// Trim every line and drop the empty ones
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

enum Step<'a> {
    Open(ElementRef<'a>),
    Text(&'a str),
    Close,
}

// Iterative walk so deeply nested markup cannot exhaust the stack.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Text(text) => out.push_str(text),
            Step::Close => out.push('\n'),
            Step::Open(element) => {
                let name = element.value().name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                    stack.push(Step::Close);
                }

                let children: Vec<Step<'_>> = element
                    .children()
                    .filter_map(|child| match child.value() {
                        Node::Text(text) => Some(Step::Text(&**text)),
                        Node::Element(_) => ElementRef::wrap(child).map(Step::Open),
                        _ => None,
                    })
                    .collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    out
}

/// Check whether a document asks for credentials
///
/// True when the markup contains a password input.
pub fn detect_login_required(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Some(selector) = parse_selector("input") else {
        return false;
    };
    document.select(&selector).any(|input| {
        input
            .value()
            .attr("type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("password"))
    })
}
