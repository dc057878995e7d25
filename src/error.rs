//! Error types for the pagewalk crate

use thiserror::Error;

/// Result type for pagewalk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pagewalk operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error while exporting results
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller-supplied argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Page fetching or crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Text processing or extraction error
    #[error("Process error: {0}")]
    Process(String),
}
