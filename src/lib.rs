//! # pagewalk - Paginated Page Scraping for Rust
//!
//! This crate renders web pages, reduces them to readable text, and walks
//! multi-page listings by finding their "next page" links. Collected text can
//! be split into model-sized chunks and handed to a completion model that
//! extracts only the data a caller describes.
//!
//! ## Features
//!
//! - Pluggable renderers: plain HTTP, headless Chrome (`browser` feature), or canned fixtures
//! - Ordered next-link heuristics with a static-markup fallback
//! - Query-parameter pagination URL rewriting
//! - Markup to text cleaning without script and style noise
//! - Character-bounded chunking
//! - Rate-limited Gemini extraction via `rig`
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use pagewalk::crawler::{CrawlerConfig, StaticRenderer, crawl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::default();
//!     let renderer = StaticRenderer::new(&config)?;
//!
//!     let session = crawl(renderer, "https://example.com/listing", 3, &config).await?;
//!     for page in &session.pages {
//!         println!("{}: {} bytes of text", page.source_url, page.text.len());
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

pub mod crawler;
pub mod processor;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::crawler::{
        CleanedPage, CrawlSession, CrawlStatus, CrawlerConfig, PaginationDecision, Renderer,
        crawl,
    };
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::processor::{ProcessorConfig, chunk, extract_insights};
}
