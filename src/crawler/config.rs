//! # Crawler Configuration Module
//!
//! This module provides the timing and sanity-check knobs for the multi-page
//! crawl controller and the renderers it drives. It uses a builder pattern for
//! flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Defaults matching a polite, patient browser session
//! - Bounded readiness wait plus a fixed settle delay for deferred content
//! - Fixed inter-request delay between consecutive pages
//! - Minimum content length below which a fetch counts as failed
//! - Cooperative cancellation checked between crawl states

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Upper bound on the wait for document readiness
    pub ready_timeout: Duration,

    /// Fixed delay after readiness so deferred content can arrive
    pub settle_delay: Duration,

    /// Delay between consecutive page requests
    pub politeness_delay: Duration,

    /// Rendered documents shorter than this many bytes are failed fetches
    pub min_content_length: usize,

    /// User agent to use for requests
    pub user_agent: String,

    /// Per-request timeout for the HTTP based renderer
    pub request_timeout: Duration,

    /// Whether the browser renderer runs without a window
    pub headless: bool,

    /// End the crawl as failed when the first page asks for a password
    pub stop_at_login: bool,

    /// Set to stop the crawl at the next state transition
    pub cancel: Arc<AtomicBool>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(20),
            settle_delay: Duration::from_secs(7),
            politeness_delay: Duration::from_secs(3),
            min_content_length: 100,
            user_agent: format!("pagewalk/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            headless: true,
            stop_at_login: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the upper bound on the readiness wait
    pub fn ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.config.ready_timeout = ready_timeout;
        self
    }

    /// Set the settle delay applied after readiness
    pub fn settle_delay(mut self, settle_delay: Duration) -> Self {
        self.config.settle_delay = settle_delay;
        self
    }

    /// Set the delay between page requests
    pub fn politeness_delay(mut self, politeness_delay: Duration) -> Self {
        self.config.politeness_delay = politeness_delay;
        self
    }

    /// Set the minimum rendered document length in bytes
    pub fn min_content_length(mut self, min_content_length: usize) -> Self {
        self.config.min_content_length = min_content_length;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout of the HTTP renderer
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Set whether the browser runs headless
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set whether a login form on the first page fails the crawl
    pub fn stop_at_login(mut self, stop_at_login: bool) -> Self {
        self.config.stop_at_login = stop_at_login;
        self
    }

    /// Share an existing cancellation flag
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.config.cancel = cancel;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Configuration with every delay set to zero, for fixtures and tests
    pub fn immediate() -> Self {
        Self::builder()
            .settle_delay(Duration::ZERO)
            .politeness_delay(Duration::ZERO)
            .build()
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Request cancellation of any crawl using this configuration
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}
