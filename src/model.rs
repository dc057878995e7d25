//! # Extraction Model Module
//!
//! Builds the completion model used for downstream extraction, with built-in
//! rate limiting to avoid exhausting the provider quota.
//!
//! ## Key Components
//!
//! - `gemini_extraction_model`: Gemini completion model behind a rate limiter
//! - `RateLimitedCompletionModel`: A wrapper that adds rate limiting to any completion model

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use rig::providers::gemini;
use tracing::info;

use crate::processor::{ProcessError, ProcessorConfig};

#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;

pub use ratelimited_completion::RateLimitedCompletionModel;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Raw provider response carried through the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitResponse<T> {
    pub response: T,
}

/// Concrete model type used by the CLI
pub type GeminiExtractionModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

/// Create the extraction model from an API key and processor configuration
pub fn gemini_extraction_model(api_key: &str, config: &ProcessorConfig) -> GeminiExtractionModel {
    let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    info!(
        "Using {} for extraction at up to {} requests per minute",
        config.llm_model, per_minute
    );
    let client = gemini::Client::new(api_key);
    RateLimitedCompletionModel::new(
        client.completion_model(&config.llm_model),
        RateLimiter::direct(Quota::per_minute(per_minute)),
    )
}

/// Create the extraction model with the key taken from `GEMINI_API_KEY`
pub fn gemini_extraction_model_from_env(
    config: &ProcessorConfig,
) -> Result<GeminiExtractionModel, ProcessError> {
    let api_key = std::env::var(GEMINI_API_KEY_VAR).map_err(|_| {
        ProcessError::InvalidArgument(format!("{GEMINI_API_KEY_VAR} environment variable must be set"))
    })?;
    if api_key.trim().is_empty() {
        return Err(ProcessError::InvalidArgument(format!(
            "{GEMINI_API_KEY_VAR} is empty"
        )));
    }
    Ok(gemini_extraction_model(&api_key, config))
}
