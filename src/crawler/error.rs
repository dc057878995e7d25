//! Error types for the crawler module

use std::time::Duration;

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The page did not become ready within the allowed time
    #[error("Timed out after {timeout:?} waiting for {url}")]
    FetchTimeout {
        /// URL being fetched
        url: String,
        /// The bound that was exceeded
        timeout: Duration,
    },

    /// The rendered document was below the minimum content threshold
    #[error("Content of {url} too short: {length} bytes (minimum {minimum})")]
    FetchTooShort {
        /// URL being fetched
        url: String,
        /// Length of the rendered document in bytes
        length: usize,
        /// Configured threshold
        minimum: usize,
    },

    /// Transport or process failure inside the renderer
    #[error("Renderer error: {0}")]
    Renderer(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid caller-supplied argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem error while exporting pages
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            CrawlError::Io(e) => CrateError::Io(e),
            CrawlError::InvalidArgument(msg) => CrateError::InvalidArgument(msg),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
