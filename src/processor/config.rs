//! # Processor Configuration Module
//!
//! Configuration for the text processing stage: how large the chunks handed
//! to the extraction model may be, which model to call, and how often.
//!
//! ## Key Components
//!
//! - `ProcessorConfig`: Complete configuration for chunking and extraction
//! - `ProcessorConfigBuilder`: Builder pattern implementation for easier configuration

use super::chunking::DEFAULT_MAX_CHUNK_LENGTH;

/// Configuration for the processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum chunk length in characters
    pub max_chunk_length: usize,

    /// LLM model to use for extraction
    pub llm_model: String,

    /// Upper bound on extraction calls per minute
    pub requests_per_minute: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            llm_model: "gemini-1.5-pro".to_string(),
            requests_per_minute: 30,
        }
    }
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the maximum chunk length
    pub fn max_chunk_length(mut self, max_chunk_length: usize) -> Self {
        self.config.max_chunk_length = max_chunk_length;
        self
    }

    /// Set the LLM model
    pub fn llm_model(mut self, llm_model: impl Into<String>) -> Self {
        self.config.llm_model = llm_model.into();
        self
    }

    /// Set the request rate limit
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.config.requests_per_minute = requests_per_minute;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}
