//! # Paginated Crawler Module
//!
//! This module retrieves rendered pages, reduces them to readable text, and
//! walks multi-page listings by discovering "next page" links. It is the first
//! stage of the pipeline, feeding cleaned text to the processor module which
//! chunks it for the extraction model.
//!
//! ## Key Components
//!
//! - `crawl`: The crawl controller, a sequential state machine over one renderer session
//! - `Renderer`: The rendering collaborator (fixture, HTTP, or headless Chrome)
//! - `next_link`: Ordered "next page" heuristics with a static-markup fallback
//! - `construct_pagination_url`: URL rewriting for query-parameter pagination
//! - `clean`: Markup to normalized text
//!
//! ## Features
//!
//! - Bounded readiness wait, settle delay and politeness delay
//! - Duplicate-content and revisited-URL termination guards
//! - Partial results preserved when a later page fails
//! - Renderer released exactly once per crawl
//!
//! ## Usage
//!
//! Pick a renderer, call `crawl`, then hand `CrawlSession::pages` to the
//! exporter or the processor.

#[cfg(feature = "browser")]
mod browser;
mod config;
pub mod content_extraction;
mod controller;
mod error;
mod fixture_renderer;
pub mod pagination;
mod renderer;
pub mod rules;
mod static_renderer;
pub mod storage;

// Re-export important types and functions
#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{clean, detect_login_required, extract_body};
pub use controller::{crawl, fetch_page};
pub use error::CrawlError;
pub use fixture_renderer::FixtureRenderer;
pub use pagination::{
    PaginationDecision, construct_pagination_url, detect_pagination_param, next_link,
    paginated_url,
};
pub use renderer::{LiveDocument, Renderer};
pub use rules::{AnchorMatch, NextLinkRule, StaticDocument, Tier};
pub use static_renderer::StaticRenderer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlStatus {
    /// Pages are still being fetched
    Running,
    /// The requested number of pages was collected
    Completed,
    /// The listing ended, repeated itself, or a later page failed
    StoppedEarly,
    /// The first page could not be fetched
    Failed,
}

/// A rendered document as returned by the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    /// URL of the document after redirects
    pub url: String,

    /// Serialized markup
    pub html: String,

    /// When the document was read
    pub fetched_at: DateTime<Utc>,
}

/// Readable text of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedPage {
    /// URL the text was taken from
    pub source_url: String,

    /// Newline-joined text without blank lines
    pub text: String,
}

/// Result of one crawl invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSession {
    /// URL the crawl started from
    pub target_url_initial: String,

    /// Upper bound on the number of pages
    pub requested_page_count: usize,

    /// Cleaned pages in fetch order
    pub pages: Vec<CleanedPage>,

    /// Final status
    pub status: CrawlStatus,

    /// The first page showed a password field
    #[serde(default)]
    pub login_required: bool,
}

impl CrawlSession {
    /// Start a session in the `Running` state
    pub fn new(target_url_initial: impl Into<String>, requested_page_count: usize) -> Self {
        Self {
            target_url_initial: target_url_initial.into(),
            requested_page_count,
            pages: Vec::new(),
            status: CrawlStatus::Running,
            login_required: false,
        }
    }

    /// Text of every page joined by a blank line
    pub fn combined_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
