//! Text processing for crawled pages
//!
//! This module splits cleaned page text into bounded chunks and runs the
//! downstream extraction model over them.

mod chunking;
mod config;
mod error;
mod extraction;

pub use chunking::{
    Chunks, DEFAULT_MAX_CHUNK_LENGTH, TextChunk, chunk, chunk_pages, chunk_text,
};
pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;
pub use extraction::{build_extraction_prompt, extract_chunk, extract_insights};
