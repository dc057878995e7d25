//! Pagination discovery
//!
//! Two independent entry points live here:
//!
//! - [`next_link`] follows the page's own "next" control, trying the live
//!   document first and a static parse of the same markup second.
//! - [`construct_pagination_url`] rewrites a pagination query parameter for
//!   callers that prefer URL arithmetic to link following.
//!
//! The two can disagree on real sites and are never combined automatically.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::renderer::LiveDocument;
use crate::crawler::rules::{AnchorMatch, NextLinkRule, StaticDocument, Tier, rules_for};

/// Query parameter names recognized as page selectors, in detection order
pub const PAGINATION_PARAMS: &[&str] = &["page", "p", "pg", "pageno", "pagenumber", "page_number"];

/// Parameter used when a URL carries none of the recognized names
pub const DEFAULT_PAGINATION_PARAM: &str = "page";

/// Outcome of looking for a following page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDecision {
    /// Whether another page was found
    pub has_next: bool,

    /// Absolute URL of the next page
    pub next_url: Option<String>,

    /// Diagnostic name of the rule that matched, prefixed with its tier
    pub matched_rule: Option<String>,
}

impl PaginationDecision {
    /// Decision for a page without a usable next link
    pub fn none() -> Self {
        Self {
            has_next: false,
            next_url: None,
            matched_rule: None,
        }
    }

    fn found(next_url: String, tier: Tier, rule: NextLinkRule) -> Self {
        let tier = match tier {
            Tier::Live => "live",
            Tier::Static => "static",
        };
        Self {
            has_next: true,
            next_url: Some(next_url),
            matched_rule: Some(format!("{tier}:{}", rule.name())),
        }
    }
}

/// Find the next page of a rendered listing
///
/// Live rules are tried in order against `document`, accepting only visible
/// anchors. If none qualifies, the static rules are tried against `markup`.
/// The matched href is resolved against `current_url`.
///
/// # Arguments
///
/// * `current_url` - URL of the rendered page, used as the base for relative links
/// * `document` - The live document to query
/// * `markup` - The rendered markup of the same page
///
/// # Returns
///
/// The pagination decision; `has_next == false` is the normal end of a listing
#[instrument(skip(document, markup))]
pub async fn next_link<D>(current_url: &str, document: &mut D, markup: &str) -> PaginationDecision
where
    D: LiveDocument + ?Sized,
{
    for rule in rules_for(Tier::Live) {
        let Some(found) = document.find_anchor(rule).await else {
            trace!("Rule {} found nothing", rule.name());
            continue;
        };
        if !found.visible {
            debug!("Rule {} matched a hidden anchor, skipping", rule.name());
            continue;
        }
        if let Some(next_url) = accept(current_url, &found) {
            debug!("Found next link with rule {}: {}", rule.name(), next_url);
            return PaginationDecision::found(next_url, Tier::Live, rule);
        }
    }

    debug!("No visible next link in the live document, trying static markup");
    let decision = static_next_link(current_url, markup);
    if !decision.has_next {
        debug!("No next page link found");
    }
    decision
}

/// Run only the static tier against markup
pub fn static_next_link(current_url: &str, markup: &str) -> PaginationDecision {
    let document = StaticDocument::parse(markup);
    for rule in rules_for(Tier::Static) {
        let Some(found) = document.first_match(rule) else {
            continue;
        };
        if let Some(next_url) = accept(current_url, &found) {
            debug!("Found next link with static rule {}: {}", rule.name(), next_url);
            return PaginationDecision::found(next_url, Tier::Static, rule);
        }
    }
    PaginationDecision::none()
}

fn accept(current_url: &str, found: &AnchorMatch) -> Option<String> {
    let href = found.href.as_deref()?;
    resolve_href(current_url, href)
}

/// Resolve an href against the page it appeared on
///
/// Returns `None` for empty hrefs, unresolvable ones, and anything that is not
/// an http(s) URL once resolved (`javascript:`, `mailto:` and similar).
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = match Url::parse(base) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        other => {
            debug!("Ignoring next link with scheme {}: {}", other, resolved);
            None
        }
    }
}

/// Name of the pagination parameter a URL already uses
///
/// Recognized names are checked in [`PAGINATION_PARAMS`] order; parameters
/// with an empty value do not count. Falls back to `"page"`.
pub fn detect_pagination_param(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return DEFAULT_PAGINATION_PARAM.to_string();
    };

    PAGINATION_PARAMS
        .iter()
        .find(|name| {
            parsed
                .query_pairs()
                .any(|(key, value)| key == **name && !value.is_empty())
        })
        .unwrap_or(&DEFAULT_PAGINATION_PARAM)
        .to_string()
}

/// Rewrite a URL to point at a given page number
///
/// Every recognized pagination parameter is removed, then `param=page_num` is
/// appended. Scheme, host, path, the remaining parameters and the fragment are
/// preserved. Whether the result is actually a different page is not checked.
///
/// # Arguments
///
/// * `url` - The URL to rewrite
/// * `page_num` - The target page number
/// * `param` - The parameter name to use, usually from [`detect_pagination_param`]
///
/// # Returns
///
/// The rewritten URL
pub fn construct_pagination_url(url: &str, page_num: u32, param: &str) -> Result<String, CrawlError> {
    if param.is_empty() {
        return Err(CrawlError::InvalidArgument(
            "pagination parameter name must not be empty".to_string(),
        ));
    }

    let mut parsed = Url::parse(url)?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !PAGINATION_PARAMS.contains(&key.as_ref()) && key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, &page_num.to_string());

    Ok(parsed.to_string())
}

/// Detect the URL's pagination parameter and rewrite it to `page_num`
pub fn paginated_url(url: &str, page_num: u32) -> Result<String, CrawlError> {
    let param = detect_pagination_param(url);
    construct_pagination_url(url, page_num, &param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Live document backed by a static parse, with visibility from markup
    struct MarkupDocument {
        markup: String,
        queried: Vec<NextLinkRule>,
    }

    impl MarkupDocument {
        fn new(markup: &str) -> Self {
            Self {
                markup: markup.to_string(),
                queried: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl LiveDocument for MarkupDocument {
        async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch> {
            self.queried.push(rule);
            StaticDocument::parse(&self.markup).first_match(rule)
        }
    }

    /// Live document that exposes nothing, as when attributes are not reported
    struct OpaqueDocument;

    #[async_trait]
    impl LiveDocument for OpaqueDocument {
        async fn find_anchor(&mut self, _rule: NextLinkRule) -> Option<AnchorMatch> {
            None
        }
    }

    const BASE: &str = "https://shop.example.com/list/index.html?sort=asc";

    #[tokio::test]
    async fn test_rel_next_wins_over_text_next() {
        let markup = r#"<body>
            <a href="/list?page=9">Next</a>
            <a rel="next" href="/list?page=2">2</a>
        </body>"#;
        let mut doc = MarkupDocument::new(markup);

        let decision = next_link(BASE, &mut doc, markup).await;
        assert!(decision.has_next);
        assert_eq!(
            decision.next_url.as_deref(),
            Some("https://shop.example.com/list?page=2")
        );
        assert_eq!(decision.matched_rule.as_deref(), Some("live:rel-contains:next"));
    }

    #[tokio::test]
    async fn test_hidden_candidate_is_skipped() {
        let markup = r#"<body>
            <a class="next" style="display:none" href="/hidden">Next</a>
            <a aria-label="Next page" href="page-2.html">›</a>
        </body>"#;
        let mut doc = MarkupDocument::new(markup);

        let decision = next_link(BASE, &mut doc, markup).await;
        assert_eq!(
            decision.next_url.as_deref(),
            Some("https://shop.example.com/list/page-2.html")
        );
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("live:aria-label-contains:Next")
        );
    }

    #[tokio::test]
    async fn test_live_rules_tried_in_order() {
        let markup = "<body><p>no links</p></body>";
        let mut doc = MarkupDocument::new(markup);

        let decision = next_link(BASE, &mut doc, markup).await;
        assert_eq!(decision, PaginationDecision::none());
        let expected: Vec<NextLinkRule> = rules_for(Tier::Live).collect();
        assert_eq!(doc.queried, expected);
    }

    #[tokio::test]
    async fn test_static_fallback_when_live_tier_is_blind() {
        let markup = r#"<body><a class="Pager-Next" href="?page=3#top">more</a></body>"#;

        let decision = next_link(BASE, &mut OpaqueDocument, markup).await;
        assert!(decision.has_next);
        assert_eq!(
            decision.next_url.as_deref(),
            Some("https://shop.example.com/list/index.html?page=3#top")
        );
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("static:class-contains-nocase:next")
        );
    }

    #[tokio::test]
    async fn test_no_next_link_is_not_an_error() {
        let markup = r#"<body><a href="/about">About</a></body>"#;
        let decision = next_link(BASE, &mut OpaqueDocument, markup).await;
        assert!(!decision.has_next);
        assert!(decision.next_url.is_none());
        assert!(decision.matched_rule.is_none());
    }

    #[tokio::test]
    async fn test_anchor_without_href_falls_through() {
        let markup = r#"<body>
            <a class="next">Next</a>
            <a title="Next" href="/two">2</a>
        </body>"#;
        let mut doc = MarkupDocument::new(markup);

        let decision = next_link(BASE, &mut doc, markup).await;
        assert_eq!(decision.next_url.as_deref(), Some("https://shop.example.com/two"));
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("https://x.com/a/b", "c").as_deref(),
            Some("https://x.com/a/c")
        );
        assert_eq!(
            resolve_href("https://x.com/a/b", "//cdn.x.com/p").as_deref(),
            Some("https://cdn.x.com/p")
        );
        assert_eq!(resolve_href("https://x.com/", "javascript:void(0)"), None);
        assert_eq!(resolve_href("https://x.com/", "   "), None);
        assert_eq!(
            resolve_href("not a url", "https://x.com/2").as_deref(),
            Some("https://x.com/2")
        );
    }

    #[test]
    fn test_detect_pagination_param() {
        assert_eq!(detect_pagination_param("https://x.com/list?pg=4"), "pg");
        assert_eq!(detect_pagination_param("https://x.com/list"), "page");
        assert_eq!(detect_pagination_param("https://x.com/list?p=2&page=5"), "page");
        assert_eq!(detect_pagination_param("https://x.com/list?pageno=&q=a"), "page");
        assert_eq!(detect_pagination_param("::garbage::"), "page");
    }

    #[test]
    fn test_construct_pagination_url() {
        assert_eq!(
            construct_pagination_url("https://x.com/list?page=2", 3, "page").unwrap(),
            "https://x.com/list?page=3"
        );
        assert_eq!(
            construct_pagination_url("https://x.com/list?q=rust&p=2&pg=7#results", 3, "pg").unwrap(),
            "https://x.com/list?q=rust&pg=3#results"
        );
        assert_eq!(
            construct_pagination_url("https://x.com/list", 2, "page").unwrap(),
            "https://x.com/list?page=2"
        );
    }

    #[test]
    fn test_construct_pagination_url_rejects_bad_input() {
        assert!(matches!(
            construct_pagination_url("https://x.com/", 2, ""),
            Err(CrawlError::InvalidArgument(_))
        ));
        assert!(matches!(
            construct_pagination_url("no scheme", 2, "page"),
            Err(CrawlError::UrlParse(_))
        ));
    }

    #[test]
    fn test_paginated_url() {
        assert_eq!(
            paginated_url("https://x.com/s?pagenumber=1&q=a", 2).unwrap(),
            "https://x.com/s?q=a&pagenumber=2"
        );
    }
}
