//! HTTP renderer without script execution
//!
//! Fetches markup with `reqwest` and answers structural queries from a static
//! parse. Pages that build their content or pagination in script will look
//! emptier than in a browser; use the browser renderer for those.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::renderer::{LiveDocument, Renderer};
use crate::crawler::rules::{AnchorMatch, NextLinkRule, StaticDocument};

/// A loaded document
#[derive(Debug, Clone)]
struct Loaded {
    url: String,
    html: String,
}

/// Renderer that downloads pages over HTTP
#[derive(Debug)]
pub struct StaticRenderer {
    client: Client,
    current: Option<Loaded>,
}

impl StaticRenderer {
    /// Create a renderer using the configured user agent and request timeout
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Create a renderer around an existing client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            current: None,
        }
    }

    fn loaded(&self) -> Result<&Loaded, CrawlError> {
        self.current
            .as_ref()
            .ok_or_else(|| CrawlError::Renderer("no page is open".to_string()))
    }
}

#[async_trait]
impl LiveDocument for StaticRenderer {
    async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch> {
        let loaded = self.current.as_ref()?;
        StaticDocument::parse(&loaded.html).first_match(rule)
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    #[instrument(skip(self))]
    async fn open(&mut self, url: &str) -> Result<(), CrawlError> {
        self.current = None;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().to_string();
        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), final_url);

        self.current = Some(Loaded {
            url: final_url,
            html,
        });
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<bool, CrawlError> {
        // The body has been read in full by the time `open` returns.
        Ok(self.current.is_some())
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        Ok(self.loaded()?.url.clone())
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        Ok(self.loaded()?.html.clone())
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.current = None;
        Ok(())
    }
}
