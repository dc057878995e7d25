//! The rendering collaborator driven by the crawl controller
//!
//! A renderer is a single stateful session: it holds the current page, answers
//! structural queries about it, and owns whatever external process backs it.
//! The controller uses it strictly sequentially and closes it exactly once.

use std::time::Duration;

use async_trait::async_trait;

use crate::crawler::error::CrawlError;
use crate::crawler::rules::{AnchorMatch, NextLinkRule};

/// Structural queries against the currently rendered document
#[async_trait]
pub trait LiveDocument: Send {
    /// First anchor in document order satisfying `rule`
    ///
    /// Returns `None` when nothing matches or the query itself failed; a
    /// missing element is an expected outcome, not an error. Visibility must
    /// reflect what is displayed, not what is merely present in the markup.
    async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch>;
}

/// A page rendering session
#[async_trait]
pub trait Renderer: LiveDocument {
    /// Navigate to `url`
    async fn open(&mut self, url: &str) -> Result<(), CrawlError>;

    /// Wait for the document to report readiness
    ///
    /// Returns `false` if readiness was not reached within `timeout`.
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, CrawlError>;

    /// URL of the current document after redirects
    async fn current_url(&mut self) -> Result<String, CrawlError>;

    /// Serialized markup of the current document
    async fn html(&mut self) -> Result<String, CrawlError>;

    /// Release the session and any process behind it
    async fn close(&mut self) -> Result<(), CrawlError>;
}

#[async_trait]
impl<T: LiveDocument + ?Sized> LiveDocument for Box<T> {
    async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch> {
        (**self).find_anchor(rule).await
    }
}

/// Lets callers pick the renderer at runtime and still hand it to `crawl`
#[async_trait]
impl<T: Renderer + ?Sized> Renderer for Box<T> {
    async fn open(&mut self, url: &str) -> Result<(), CrawlError> {
        (**self).open(url).await
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, CrawlError> {
        (**self).wait_until_ready(timeout).await
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        (**self).current_url().await
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        (**self).html().await
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        (**self).close().await
    }
}
