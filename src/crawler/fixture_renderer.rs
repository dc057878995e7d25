//! In-memory renderer serving canned pages
//!
//! Useful for replaying saved listings offline and for exercising the crawl
//! controller without a browser. Visibility is estimated from the markup the
//! same way the static renderer does it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::crawler::error::CrawlError;
use crate::crawler::renderer::{LiveDocument, Renderer};
use crate::crawler::rules::{AnchorMatch, NextLinkRule, StaticDocument};

#[derive(Debug, Clone)]
enum Fixture {
    Page(String),
    Error(String),
}

/// Renderer backed by a map from URL to markup
#[derive(Debug, Default)]
pub struct FixtureRenderer {
    fixtures: HashMap<String, Fixture>,
    current: Option<(String, String)>,
    never_ready: bool,
    cancel_on: Option<(String, Arc<AtomicBool>)>,
    opened: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl FixtureRenderer {
    /// Create an empty renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.fixtures
            .insert(url.to_string(), Fixture::Page(html.to_string()));
        self
    }

    /// Fail navigation to `url` with a renderer error
    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.fixtures
            .insert(url.to_string(), Fixture::Error(message.to_string()));
        self
    }

    /// Never report readiness
    pub fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    /// Raise `flag` when `url` is opened, as an interrupt arriving mid-fetch would
    pub fn with_cancel_on(mut self, url: &str, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on = Some((url.to_string(), flag));
        self
    }

    /// Shared count of `close` calls
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    /// Shared log of every URL passed to `open`
    pub fn opened_urls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.opened)
    }

    fn current(&self) -> Result<&(String, String), CrawlError> {
        self.current
            .as_ref()
            .ok_or_else(|| CrawlError::Renderer("no page is open".to_string()))
    }
}

#[async_trait]
impl LiveDocument for FixtureRenderer {
    async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch> {
        let (_, html) = self.current.as_ref()?;
        StaticDocument::parse(html).first_match(rule)
    }
}

#[async_trait]
impl Renderer for FixtureRenderer {
    async fn open(&mut self, url: &str) -> Result<(), CrawlError> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        self.current = None;
        if let Some((trigger, flag)) = &self.cancel_on {
            if trigger == url {
                flag.store(true, Ordering::SeqCst);
            }
        }

        match self.fixtures.get(url) {
            Some(Fixture::Page(html)) => {
                self.current = Some((url.to_string(), html.clone()));
                Ok(())
            }
            Some(Fixture::Error(message)) => Err(CrawlError::Renderer(message.clone())),
            None => Err(CrawlError::Renderer(format!("no fixture for {url}"))),
        }
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<bool, CrawlError> {
        Ok(!self.never_ready && self.current.is_some())
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        Ok(self.current()?.0.clone())
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        Ok(self.current()?.1.clone())
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.current = None;
        Ok(())
    }
}
