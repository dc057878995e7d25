//! Export of crawl results to disk
//!
//! Pages are written one text file per page (`scraped_page_1.txt`, ...) or
//! concatenated into a single file; whole sessions can be saved as JSON.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::info;

use super::error::CrawlError;
use super::{CleanedPage, CrawlSession};

type Result<T> = std::result::Result<T, CrawlError>;

/// File receiving the concatenated text of a crawl
pub const CONCATENATED_FILE_NAME: &str = "scraped_content.txt";

/// How page text is laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// `scraped_page_1.txt`, `scraped_page_2.txt`, ...
    PerPage,
    /// Everything in [`CONCATENATED_FILE_NAME`]
    Concatenated,
}

impl PageLayout {
    /// Single-page runs and explicit requests get one concatenated file
    pub fn for_run(requested_pages: usize, concatenated: bool) -> Self {
        if concatenated || requested_pages == 1 {
            Self::Concatenated
        } else {
            Self::PerPage
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory receiving the exported files
    pub base_path: PathBuf,

    /// File name prefix for per-page files
    pub page_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            page_prefix: "scraped_page".to_string(),
        }
    }
}

/// Writes crawl output under a base directory
#[derive(Debug, Clone, Default)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new storage with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Storage rooted at `base_path` with the default prefix
    pub fn in_dir(base_path: impl Into<PathBuf>) -> Self {
        Self::with_config(StorageConfig {
            base_path: base_path.into(),
            ..StorageConfig::default()
        })
    }

    /// Path of the file for the page at 1-based `index`
    pub fn page_path(&self, index: usize) -> PathBuf {
        self.config
            .base_path
            .join(format!("{}_{}.txt", self.config.page_prefix, index))
    }

    async fn ensure_directories(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.ensure_directories(path).await?;
        fs::write(path, contents).await?;
        info!("Saved {} bytes to {}", contents.len(), path.display());
        Ok(())
    }

    /// Write each page's text to its own numbered file
    ///
    /// # Returns
    ///
    /// The written paths, in page order
    pub async fn write_pages(&self, pages: &[CleanedPage]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let path = self.page_path(i + 1);
            self.write(&path, &page.text).await?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write every page's text into one file, pages separated by a blank line
    pub async fn write_concatenated(&self, file_name: &str, pages: &[CleanedPage]) -> Result<PathBuf> {
        let joined = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let path = self.config.base_path.join(file_name);
        self.write(&path, &joined).await?;
        Ok(path)
    }

    /// Write page text in the given layout
    ///
    /// # Returns
    ///
    /// Every written path; a concatenated export always writes exactly one file
    pub async fn export(&self, pages: &[CleanedPage], layout: PageLayout) -> Result<Vec<PathBuf>> {
        match layout {
            PageLayout::PerPage => self.write_pages(pages).await,
            PageLayout::Concatenated => Ok(vec![
                self.write_concatenated(CONCATENATED_FILE_NAME, pages).await?,
            ]),
        }
    }

    /// Save a whole session as pretty-printed JSON
    pub async fn write_session_json(&self, file_name: &str, session: &CrawlSession) -> Result<PathBuf> {
        let path = self.config.base_path.join(file_name);
        let json = to_pretty_json(session)?;
        self.write(&path, &json).await?;
        Ok(path)
    }

    /// Save extracted text produced downstream
    pub async fn write_extracted(&self, file_name: &str, text: &str) -> Result<PathBuf> {
        let path = self.config.base_path.join(file_name);
        self.write(&path, text).await?;
        Ok(path)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CrawlError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
