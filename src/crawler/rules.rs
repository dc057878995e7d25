//! Ordered "next page" link heuristics
//!
//! The rule list is an ordered contract: real pages routinely carry several
//! candidates at once (a `rel="next"` link *and* a "Next" button, say), so the
//! first rule that yields a usable anchor decides. Live rules run against the
//! renderer's document and require visibility; static rules re-check the same
//! markup with `scraper` when the live tier finds nothing.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Which document a rule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    /// The renderer's current document, visible anchors only
    Live,
    /// A static parse of the rendered markup
    Static,
}

/// A single anchor predicate
///
/// Each rule resolves to the first anchor in document order that satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NextLinkRule {
    /// `class` attribute contains the substring
    ClassContains(&'static str),
    /// `class` attribute contains the substring, ignoring ASCII case
    ClassContainsIgnoreCase(&'static str),
    /// one of the whitespace separated classes equals the value
    ClassToken(&'static str),
    /// `rel` attribute contains the substring
    RelContains(&'static str),
    /// one of the whitespace separated `rel` values equals the value
    RelToken(&'static str),
    /// the anchor's text contains the substring
    TextContains(&'static str),
    /// `aria-label` contains the substring
    AriaLabelContains(&'static str),
    /// `title` contains the substring
    TitleContains(&'static str),
    /// anchor classed `pagination` whose text contains the substring
    PaginationText(&'static str),
    /// anchor that is a following sibling of an anchor classed `pagination`
    PaginationSibling,
    /// first anchor after an anchor classed `pagination` in document order
    AfterPagination,
}

/// Every heuristic in evaluation order
///
/// The live tier is exhausted before the static tier starts.
pub const RULES: &[(Tier, NextLinkRule)] = &[
    (Tier::Live, NextLinkRule::ClassContains("next")),
    (Tier::Live, NextLinkRule::ClassContains("pagination-next")),
    (Tier::Live, NextLinkRule::RelContains("next")),
    (Tier::Live, NextLinkRule::TextContains("Next")),
    (Tier::Live, NextLinkRule::TextContains("Next Page")),
    (Tier::Live, NextLinkRule::AriaLabelContains("Next")),
    (Tier::Live, NextLinkRule::TitleContains("Next")),
    (Tier::Live, NextLinkRule::PaginationText("»")),
    (Tier::Live, NextLinkRule::PaginationText(">")),
    (Tier::Live, NextLinkRule::PaginationSibling),
    (Tier::Live, NextLinkRule::AfterPagination),
    (Tier::Static, NextLinkRule::ClassContainsIgnoreCase("next")),
    (Tier::Static, NextLinkRule::RelToken("next")),
    (Tier::Static, NextLinkRule::TextContains("Next")),
    (Tier::Static, NextLinkRule::ClassToken("pagination-next")),
    (Tier::Static, NextLinkRule::ClassToken("next")),
    (Tier::Static, NextLinkRule::AriaLabelContains("Next")),
    (Tier::Static, NextLinkRule::TitleContains("Next")),
];

/// Rules of one tier, in order
pub fn rules_for(tier: Tier) -> impl Iterator<Item = NextLinkRule> {
    RULES
        .iter()
        .filter(move |(t, _)| *t == tier)
        .map(|(_, rule)| *rule)
}

const PAGINATION_CLASS: &str = "pagination";

impl NextLinkRule {
    /// Short diagnostic name, e.g. `rel-contains:next`
    pub fn name(&self) -> String {
        match self {
            Self::ClassContains(v) => format!("class-contains:{v}"),
            Self::ClassContainsIgnoreCase(v) => format!("class-contains-nocase:{v}"),
            Self::ClassToken(v) => format!("class-token:{v}"),
            Self::RelContains(v) => format!("rel-contains:{v}"),
            Self::RelToken(v) => format!("rel-token:{v}"),
            Self::TextContains(v) => format!("text-contains:{v}"),
            Self::AriaLabelContains(v) => format!("aria-label-contains:{v}"),
            Self::TitleContains(v) => format!("title-contains:{v}"),
            Self::PaginationText(v) => format!("pagination-text:{v}"),
            Self::PaginationSibling => "pagination-sibling".to_string(),
            Self::AfterPagination => "after-pagination".to_string(),
        }
    }

    /// XPath expression selecting the rule's candidates, for DOM-side evaluation
    pub fn xpath(&self) -> String {
        match self {
            Self::ClassContains(v) => format!("//a[contains(@class, '{v}')]"),
            Self::ClassContainsIgnoreCase(v) => format!(
                "//a[contains(translate(@class, 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '{}')]",
                v.to_ascii_lowercase()
            ),
            Self::ClassToken(v) => {
                format!("//a[contains(concat(' ', normalize-space(@class), ' '), ' {v} ')]")
            }
            Self::RelContains(v) => format!("//a[contains(@rel, '{v}')]"),
            Self::RelToken(v) => {
                format!("//a[contains(concat(' ', normalize-space(@rel), ' '), ' {v} ')]")
            }
            Self::TextContains(v) => format!("//a[contains(., '{v}')]"),
            Self::AriaLabelContains(v) => format!("//a[contains(@aria-label, '{v}')]"),
            Self::TitleContains(v) => format!("//a[contains(@title, '{v}')]"),
            Self::PaginationText(v) => {
                format!("//a[contains(@class, '{PAGINATION_CLASS}') and contains(., '{v}')]")
            }
            Self::PaginationSibling => {
                format!("//a[contains(@class, '{PAGINATION_CLASS}')]/following-sibling::a")
            }
            Self::AfterPagination => {
                format!("//a[contains(@class, '{PAGINATION_CLASS}')]/following::a[1]")
            }
        }
    }

    /// Whether a single anchor satisfies an element-local rule
    ///
    /// Positional rules never match here; they need the whole document.
    pub fn matches(&self, anchor: &ElementRef<'_>) -> bool {
        let attr = |name: &str| anchor.value().attr(name);
        match self {
            Self::ClassContains(v) => attr("class").is_some_and(|c| c.contains(v)),
            Self::ClassContainsIgnoreCase(v) => attr("class")
                .is_some_and(|c| c.to_lowercase().contains(&v.to_lowercase())),
            Self::ClassToken(v) => {
                attr("class").is_some_and(|c| c.split_whitespace().any(|t| t == *v))
            }
            Self::RelContains(v) => attr("rel").is_some_and(|r| r.contains(v)),
            Self::RelToken(v) => attr("rel").is_some_and(|r| r.split_whitespace().any(|t| t == *v)),
            Self::TextContains(v) => anchor_text(anchor).contains(v),
            Self::AriaLabelContains(v) => attr("aria-label").is_some_and(|l| l.contains(v)),
            Self::TitleContains(v) => attr("title").is_some_and(|t| t.contains(v)),
            Self::PaginationText(v) => is_pagination(anchor) && anchor_text(anchor).contains(v),
            Self::PaginationSibling | Self::AfterPagination => false,
        }
    }
}

fn anchor_text(anchor: &ElementRef<'_>) -> String {
    anchor.text().collect()
}

fn is_pagination(anchor: &ElementRef<'_>) -> bool {
    anchor
        .value()
        .attr("class")
        .is_some_and(|c| c.contains(PAGINATION_CLASS))
}

/// The anchor a rule resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatch {
    /// Raw `href` attribute, possibly relative
    pub href: Option<String>,

    /// Whether the anchor is currently displayed
    pub visible: bool,
}

/// Read-only structural view over parsed markup
pub struct StaticDocument {
    html: Html,
    anchor_selector: Option<Selector>,
}

impl StaticDocument {
    /// Parse markup without executing anything
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            anchor_selector: Selector::parse("a").ok(),
        }
    }

    fn anchors(&self) -> Vec<ElementRef<'_>> {
        match &self.anchor_selector {
            Some(selector) => self.html.select(selector).collect(),
            None => Vec::new(),
        }
    }

    /// First anchor satisfying the rule, with estimated visibility
    pub fn first_match(&self, rule: NextLinkRule) -> Option<AnchorMatch> {
        let anchors = self.anchors();
        let found = match rule {
            NextLinkRule::PaginationSibling => anchors.iter().filter(|a| is_pagination(a)).find_map(|a| {
                a.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|sibling| sibling.value().name() == "a")
            }),
            NextLinkRule::AfterPagination => anchors
                .iter()
                .position(is_pagination)
                .and_then(|pos| anchors.get(pos + 1).copied()),
            _ => anchors.iter().find(|a| rule.matches(a)).copied(),
        }?;

        Some(AnchorMatch {
            href: found.value().attr("href").map(str::to_string),
            visible: is_displayed(&found),
        })
    }
}

/// Best-effort visibility from markup alone
///
/// Without layout information the only signals are the `hidden` attribute,
/// `aria-hidden`, hidden inputs and inline styles on the element or its ancestors.
pub fn is_displayed(element: &ElementRef<'_>) -> bool {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| !hides_itself(&el))
}

fn hides_itself(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if value
        .attr("type")
        .is_some_and(|v| v.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}
