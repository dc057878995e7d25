//! Multi-page crawl controller
//!
//! A crawl is an explicit state machine:
//!
//! ```text
//! Fetching -> Cleaning -> Deciding -> Advancing -> Fetching -> ... -> Terminal
//! ```
//!
//! Every state can jump straight to `Terminal`. Fetch failures never surface as
//! errors: on the first page the session ends `Failed`, afterwards it ends
//! `StoppedEarly` with the pages gathered so far.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::content_extraction;
use crate::crawler::error::CrawlError;
use crate::crawler::pagination::next_link;
use crate::crawler::renderer::Renderer;
use crate::crawler::{CleanedPage, CrawlSession, CrawlStatus, RawPage};

/// Crawl a paginated listing by following its "next" links
///
/// The renderer is owned by this call and closed exactly once before it
/// returns, whatever state the crawl ended in.
///
/// # Arguments
///
/// * `renderer` - The rendering session to drive
/// * `start_url` - URL of the first page
/// * `page_count` - Maximum number of pages to collect, at least 1
/// * `config` - Timing and sanity-check configuration
///
/// # Returns
///
/// The finished session, `InvalidArgument` for a zero page count, or
/// `UrlParse` for an unparseable start URL
#[instrument(skip(renderer, config))]
pub async fn crawl<R>(
    mut renderer: R,
    start_url: &str,
    page_count: usize,
    config: &CrawlerConfig,
) -> Result<CrawlSession, CrawlError>
where
    R: Renderer,
{
    let result = match validate(start_url, page_count) {
        Ok(()) => {
            let machine = CrawlMachine {
                renderer: &mut renderer,
                config,
                session: CrawlSession::new(start_url, page_count),
            };
            Ok(machine.run().await)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = renderer.close().await {
        warn!("Failed to close renderer: {}", e);
    }

    if let Ok(session) = &result {
        info!(
            "Crawl finished with status {:?}: {} of {} pages",
            session.status,
            session.pages.len(),
            session.requested_page_count
        );
    }
    result
}

fn validate(start_url: &str, page_count: usize) -> Result<(), CrawlError> {
    if page_count == 0 {
        return Err(CrawlError::InvalidArgument(
            "page count must be at least 1".to_string(),
        ));
    }
    Url::parse(start_url)?;
    Ok(())
}

/// Fetch one rendered page
///
/// Opening and the readiness wait share the `ready_timeout` bound; the settle
/// delay follows, then the document is read and checked against the minimum
/// content length.
pub async fn fetch_page<R>(
    renderer: &mut R,
    url: &str,
    config: &CrawlerConfig,
) -> Result<RawPage, CrawlError>
where
    R: Renderer + ?Sized,
{
    let timeout = config.ready_timeout;
    let timed_out = || CrawlError::FetchTimeout {
        url: url.to_string(),
        timeout,
    };

    let ready = tokio::time::timeout(timeout, async {
        renderer.open(url).await?;
        renderer.wait_until_ready(timeout).await
    })
    .await
    .map_err(|_| timed_out())??;
    if !ready {
        return Err(timed_out());
    }

    if !config.settle_delay.is_zero() {
        debug!("Waiting {:?} for deferred content", config.settle_delay);
        tokio::time::sleep(config.settle_delay).await;
    }

    let current_url = renderer.current_url().await?;
    let html = renderer.html().await?;
    debug!("Page content length: {} bytes", html.len());

    if html.len() < config.min_content_length {
        return Err(CrawlError::FetchTooShort {
            url: current_url,
            length: html.len(),
            minimum: config.min_content_length,
        });
    }

    Ok(RawPage {
        url: current_url,
        html,
        fetched_at: Utc::now(),
    })
}

enum CrawlState {
    Fetching { url: String },
    Cleaning { raw: RawPage },
    Deciding { raw: RawPage, page: CleanedPage },
    Advancing { next_url: String },
    Terminal(CrawlStatus),
}

impl CrawlState {
    fn name(&self) -> &'static str {
        match self {
            Self::Fetching { .. } => "fetching",
            Self::Cleaning { .. } => "cleaning",
            Self::Deciding { .. } => "deciding",
            Self::Advancing { .. } => "advancing",
            Self::Terminal(_) => "terminal",
        }
    }
}

struct CrawlMachine<'a, R: ?Sized> {
    renderer: &'a mut R,
    config: &'a CrawlerConfig,
    session: CrawlSession,
}

impl<R> CrawlMachine<'_, R>
where
    R: Renderer + ?Sized,
{
    async fn run(mut self) -> CrawlSession {
        let mut state = CrawlState::Fetching {
            url: self.session.target_url_initial.clone(),
        };

        loop {
            if self.config.is_cancelled() && !matches!(state, CrawlState::Terminal(_)) {
                info!("Crawl cancelled while {}", state.name());
                state = CrawlState::Terminal(self.stop_status());
            }

            state = match state {
                CrawlState::Fetching { url } => self.fetch(url).await,
                CrawlState::Cleaning { raw } => self.clean(raw),
                CrawlState::Deciding { raw, page } => self.decide(raw, page).await,
                CrawlState::Advancing { next_url } => self.advance(next_url).await,
                CrawlState::Terminal(status) => {
                    self.session.status = status;
                    return self.session;
                }
            };
        }
    }

    /// `Failed` before the first page is in, `StoppedEarly` after
    fn stop_status(&self) -> CrawlStatus {
        if self.session.pages.is_empty() {
            CrawlStatus::Failed
        } else {
            CrawlStatus::StoppedEarly
        }
    }

    fn already_fetched(&self, url: &str) -> bool {
        let key = without_fragment(url);
        self.session
            .pages
            .iter()
            .any(|page| without_fragment(&page.source_url) == key)
    }

    async fn fetch(&mut self, url: String) -> CrawlState {
        info!(
            "Processing page {} of {}: {}",
            self.session.pages.len() + 1,
            self.session.requested_page_count,
            url
        );

        match fetch_page(&mut *self.renderer, &url, self.config).await {
            Ok(raw) => CrawlState::Cleaning { raw },
            Err(e) => {
                warn!("Failed to get page content for {}: {}", url, e);
                CrawlState::Terminal(self.stop_status())
            }
        }
    }

    fn clean(&mut self, raw: RawPage) -> CrawlState {
        if self.already_fetched(&raw.url) {
            info!("{} was already collected in this crawl, stopping", raw.url);
            return CrawlState::Terminal(CrawlStatus::StoppedEarly);
        }

        if self.session.pages.is_empty() && content_extraction::detect_login_required(&raw.html) {
            warn!("{} shows a password field; this page needs a login", raw.url);
            self.session.login_required = true;
            if self.config.stop_at_login {
                return CrawlState::Terminal(CrawlStatus::Failed);
            }
        }

        let text = content_extraction::clean(&raw.html);
        if let Some(previous) = self.session.pages.last() {
            if previous.text == text {
                info!("Page content is identical to the previous page, stopping");
                return CrawlState::Terminal(CrawlStatus::StoppedEarly);
            }
        }

        let page = CleanedPage {
            source_url: raw.url.clone(),
            text,
        };
        CrawlState::Deciding { raw, page }
    }

    async fn decide(&mut self, raw: RawPage, page: CleanedPage) -> CrawlState {
        self.session.pages.push(page);
        info!("Successfully scraped page {}", self.session.pages.len());

        if self.session.pages.len() >= self.session.requested_page_count {
            info!("Reached desired number of pages");
            return CrawlState::Terminal(CrawlStatus::Completed);
        }

        let decision = next_link(&raw.url, &mut *self.renderer, &raw.html).await;
        match decision.next_url {
            Some(next_url) if self.already_fetched(&next_url) => {
                info!("Next link points back to {}, stopping", next_url);
                CrawlState::Terminal(CrawlStatus::StoppedEarly)
            }
            Some(next_url) => {
                debug!(
                    "Next page via {}: {}",
                    decision.matched_rule.as_deref().unwrap_or("unknown rule"),
                    next_url
                );
                CrawlState::Advancing { next_url }
            }
            None => {
                info!("No next page link found");
                CrawlState::Terminal(CrawlStatus::StoppedEarly)
            }
        }
    }

    async fn advance(&mut self, next_url: String) -> CrawlState {
        if !self.config.politeness_delay.is_zero() {
            debug!("Waiting {:?} before next page request", self.config.politeness_delay);
            tokio::time::sleep(self.config.politeness_delay).await;
        }
        CrawlState::Fetching { url: next_url }
    }
}

fn without_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(head, _)| head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FixtureRenderer;
    use std::time::Duration;

    fn page(title: &str, body: &str) -> String {
        format!(
            "<html><head><title>{title}</title><style>body {{ margin: 0 }}</style></head>\
             <body><h1>{title}</h1><div class=\"listing\">{body}</div></body></html>"
        )
    }

    fn three_pages() -> FixtureRenderer {
        FixtureRenderer::new()
            .with_page(
                "https://list.example.com/items",
                &page("Page 1", r#"<p>alpha</p><a rel="next" href="/items?page=2">2</a>"#),
            )
            .with_page(
                "https://list.example.com/items?page=2",
                &page("Page 2", r#"<p>beta</p><a class="next" href="?page=3">Next</a>"#),
            )
            .with_page(
                "https://list.example.com/items?page=3",
                &page("Page 3", "<p>gamma</p>"),
            )
    }

    #[tokio::test]
    async fn test_three_page_crawl_completes() {
        let renderer = three_pages();
        let closes = renderer.close_counter();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://list.example.com/items", 3, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Completed);
        assert_eq!(session.pages.len(), 3);
        assert_eq!(session.pages[0].text, "Page 1\nalpha\n2");
        assert_eq!(session.pages[2].source_url, "https://list.example.com/items?page=3");
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_next_link_stops_early() {
        let renderer = three_pages();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://list.example.com/items", 5, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::StoppedEarly);
        assert_eq!(session.pages.len(), 3);
    }

    #[tokio::test]
    async fn test_page_count_bounds_fetches() {
        let renderer = three_pages();
        let opened = renderer.opened_urls();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://list.example.com/items", 2, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Completed);
        assert_eq!(session.pages.len(), 2);
        assert_eq!(opened.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_content_stops_after_first_page() {
        let same = page("Same", r#"<p>content</p><a class="next" href="/b">Next</a>"#);
        let renderer = FixtureRenderer::new()
            .with_page("https://dup.example.com/a", &same)
            .with_page("https://dup.example.com/b", &same);
        let closes = renderer.close_counter();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://dup.example.com/a", 3, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::StoppedEarly);
        assert_eq!(session.pages.len(), 1);
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_failed() {
        let renderer = FixtureRenderer::new().with_page("https://short.example.com/", "<p>x</p>");
        let closes = renderer.close_counter();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://short.example.com/", 2, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Failed);
        assert!(session.pages.is_empty());
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mid_crawl_failure_keeps_partial_results() {
        let renderer = FixtureRenderer::new()
            .with_page(
                "https://err.example.com/1",
                &page("One", r#"<a rel="next" href="/2">more</a>"#),
            )
            .with_error("https://err.example.com/2", "connection reset");
        let closes = renderer.close_counter();
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://err.example.com/1", 3, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::StoppedEarly);
        assert_eq!(session.pages.len(), 1);
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_readiness_timeout_is_a_fetch_failure() {
        let mut renderer = FixtureRenderer::new()
            .with_page("https://slow.example.com/", &page("Slow", "<p>late</p>"))
            .never_ready();
        let config = CrawlerConfig::builder()
            .ready_timeout(Duration::from_millis(20))
            .settle_delay(Duration::ZERO)
            .politeness_delay(Duration::ZERO)
            .build();

        let err = fetch_page(&mut renderer, "https://slow.example.com/", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::FetchTimeout { .. }));
    }

    #[tokio::test]
    async fn test_link_back_to_seen_page_stops() {
        let renderer = FixtureRenderer::new()
            .with_page(
                "https://loop.example.com/1",
                &page("One", r#"<a rel="next" href="/2">2</a>"#),
            )
            .with_page(
                "https://loop.example.com/2",
                &page("Two", r#"<a rel="next" href="/1#top">1</a>"#),
            );
        let config = CrawlerConfig::immediate();

        let session = crawl(renderer, "https://loop.example.com/1", 5, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::StoppedEarly);
        assert_eq!(session.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_arguments_still_close_renderer() {
        let renderer = three_pages();
        let closes = renderer.close_counter();
        let config = CrawlerConfig::immediate();

        let err = crawl(renderer, "https://list.example.com/items", 0, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidArgument(_)));
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);

        let renderer = three_pages();
        let closes = renderer.close_counter();
        let err = crawl(renderer, "not a url", 1, &config).await.unwrap_err();
        assert!(matches!(err, CrawlError::UrlParse(_)));
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_crawl_fetches_nothing() {
        let renderer = three_pages();
        let opened = renderer.opened_urls();
        let config = CrawlerConfig::immediate();
        config.cancel();

        let session = crawl(renderer, "https://list.example.com/items", 3, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Failed);
        assert!(opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_first_page_keeps_it() {
        let config = CrawlerConfig::immediate();
        let renderer = three_pages()
            .with_cancel_on("https://list.example.com/items?page=2", config.cancel.clone());
        let opened = renderer.opened_urls();
        let closes = renderer.close_counter();

        let session = crawl(renderer, "https://list.example.com/items", 3, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::StoppedEarly);
        assert_eq!(session.pages.len(), 1);
        assert_eq!(session.pages[0].source_url, "https://list.example.com/items");
        assert_eq!(opened.lock().unwrap().len(), 2);
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    fn login_wall() -> FixtureRenderer {
        FixtureRenderer::new()
            .with_page(
                "https://members.example.com/list",
                &page(
                    "Sign in",
                    r#"<form><input name="user"><input type="password" name="pw"></form>
                       <a rel="next" href="/list?page=2">2</a>"#,
                ),
            )
            .with_page(
                "https://members.example.com/list?page=2",
                &page("Page 2", "<p>more</p>"),
            )
    }

    #[tokio::test]
    async fn test_login_page_fails_crawl_when_stopping_at_login() {
        let renderer = login_wall();
        let opened = renderer.opened_urls();
        let closes = renderer.close_counter();
        let config = CrawlerConfig::builder()
            .settle_delay(Duration::ZERO)
            .politeness_delay(Duration::ZERO)
            .stop_at_login(true)
            .build();

        let session = crawl(renderer, "https://members.example.com/list", 2, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Failed);
        assert!(session.login_required);
        assert!(session.pages.is_empty());
        assert_eq!(opened.lock().unwrap().len(), 1);
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_page_is_flagged_but_crawled_by_default() {
        let config = CrawlerConfig::immediate();

        let session = crawl(login_wall(), "https://members.example.com/list", 2, &config)
            .await
            .unwrap();

        assert_eq!(session.status, CrawlStatus::Completed);
        assert!(session.login_required);
        assert_eq!(session.pages.len(), 2);

        let session = crawl(three_pages(), "https://list.example.com/items", 1, &config)
            .await
            .unwrap();
        assert!(!session.login_required);
    }

    #[test]
    fn test_without_fragment() {
        assert_eq!(without_fragment("https://x.com/a#b"), "https://x.com/a");
        assert_eq!(without_fragment("https://x.com/a"), "https://x.com/a");
    }
}
