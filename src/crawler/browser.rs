//! Headless Chrome renderer
//!
//! Uses chromiumoxide (CDP). Rules are evaluated as XPath inside the page and
//! visibility comes from layout, so hidden "next" controls are told apart from
//! visible ones the way a user would see them.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::renderer::{LiveDocument, Renderer};
use crate::crawler::rules::{AnchorMatch, NextLinkRule};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// JavaScript locating the first XPath match and reporting its href and visibility
const FIND_ANCHOR_SCRIPT: &str = r#"
(() => {
    const node = document.evaluate(__XPATH__, document, null,
        XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
    if (!node) {
        return "null";
    }
    const style = window.getComputedStyle(node);
    const visible = node.getClientRects().length > 0
        && style.visibility !== "hidden"
        && style.display !== "none";
    return JSON.stringify({ href: node.getAttribute("href"), visible: visible });
})()
"#;

#[derive(Debug, Deserialize)]
struct AnchorLookup {
    href: Option<String>,
    visible: bool,
}

fn renderer_error(err: impl std::fmt::Display) -> CrawlError {
    CrawlError::Renderer(err.to_string())
}

/// Renderer driving a Chrome/Chromium process
pub struct BrowserRenderer {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
}

impl BrowserRenderer {
    /// Launch a browser and open a blank tab
    pub async fn launch(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(CrawlError::Renderer)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(renderer_error)?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(renderer_error)?;

        Ok(Self {
            browser: Some(browser),
            handler: Some(handle),
            page: Some(page),
        })
    }

    fn page(&self) -> Result<&Page, CrawlError> {
        self.page
            .as_ref()
            .ok_or_else(|| CrawlError::Renderer("browser session is closed".to_string()))
    }

    async fn ready_state(&self) -> Result<String, CrawlError> {
        let result = self
            .page()?
            .evaluate("document.readyState")
            .await
            .map_err(renderer_error)?;
        result.into_value::<String>().map_err(renderer_error)
    }
}

#[async_trait]
impl LiveDocument for BrowserRenderer {
    async fn find_anchor(&mut self, rule: NextLinkRule) -> Option<AnchorMatch> {
        let page = self.page.as_ref()?;
        let xpath = serde_json::to_string(&rule.xpath()).ok()?;
        let script = FIND_ANCHOR_SCRIPT.replace("__XPATH__", &xpath);

        let raw = match page.evaluate(script).await {
            Ok(result) => result.into_value::<String>().ok()?,
            Err(e) => {
                debug!("Rule {} could not be evaluated: {}", rule.name(), e);
                return None;
            }
        };
        let found: Option<AnchorLookup> = serde_json::from_str(&raw).ok()?;
        found.map(|p| AnchorMatch {
            href: p.href,
            visible: p.visible,
        })
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn open(&mut self, url: &str) -> Result<(), CrawlError> {
        debug!("Navigating to URL: {}", url);
        self.page()?.goto(url).await.map_err(renderer_error)?;
        Ok(())
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<bool, CrawlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.ready_state().await? == "complete" {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!("Timeout waiting for page ready state");
                return Ok(false);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        self.page()?
            .url()
            .await
            .map_err(renderer_error)?
            .ok_or_else(|| CrawlError::Renderer("page has no URL".to_string()))
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        self.page()?.content().await.map_err(renderer_error)
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close tab: {}", e);
            }
        }
        match self.browser.take() {
            Some(mut browser) => {
                let closed = browser.close().await.map(|_| ());
                release(closed, browser.wait(), self.handler.take()).await
            }
            None => {
                if let Some(handle) = self.handler.take() {
                    handle.abort();
                }
                Ok(())
            }
        }
    }
}

/// Finish a shutdown whatever the close request returned
///
/// The process is always waited for and the event handler always stopped; a
/// failed close is reported after both.
async fn release<E, W, T, F>(
    closed: Result<(), E>,
    wait: W,
    handler: Option<JoinHandle<()>>,
) -> Result<(), CrawlError>
where
    E: std::fmt::Display,
    W: std::future::Future<Output = Result<T, F>>,
    F: std::fmt::Display,
{
    if let Err(e) = &closed {
        warn!("Failed to close browser: {}", e);
    }
    if let Err(e) = wait.await {
        warn!("Browser process did not exit cleanly: {}", e);
    }
    if let Some(handle) = handler {
        handle.abort();
    }
    closed.map_err(renderer_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn pending_handler() -> (JoinHandle<()>, tokio::sync::oneshot::Receiver<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _keep = tx;
            std::future::pending::<()>().await;
        });
        (handle, rx)
    }

    #[tokio::test]
    async fn test_failed_close_still_waits_and_stops_handler() {
        let (handle, stopped) = pending_handler();
        let waited = Arc::new(AtomicBool::new(false));
        let waited_flag = Arc::clone(&waited);

        let result = release(
            Err("websocket closed"),
            async move {
                waited_flag.store(true, Ordering::SeqCst);
                Ok::<(), String>(())
            },
            Some(handle),
        )
        .await;

        assert!(matches!(result, Err(CrawlError::Renderer(msg)) if msg == "websocket closed"));
        assert!(waited.load(Ordering::SeqCst));
        assert!(stopped.await.is_err());
    }

    #[tokio::test]
    async fn test_clean_close() {
        let (handle, stopped) = pending_handler();
        let result = release(
            Ok::<(), String>(()),
            async { Err::<(), _>("no such process") },
            Some(handle),
        )
        .await;

        assert!(result.is_ok());
        assert!(stopped.await.is_err());
    }
}
