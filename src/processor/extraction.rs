//! Downstream extraction over chunked page text
//!
//! Each chunk is sent to the completion model with an instruction prompt
//! asking for only the data matching a free-form description. Chunks are
//! processed in order; a chunk whose call fails is logged and left out.

use rig::completion::{AssistantContent, CompletionModel};
use tracing::{debug, info, instrument, warn};

use super::chunking::chunk;
use super::error::ProcessError;

/// Build the instruction prompt for one chunk
pub fn build_extraction_prompt(chunk: &str, description: &str) -> String {
    format!(
        "You are tasked with extracting specific information from the following text content: {chunk}. \
        Please follow these instructions carefully: \n\n\
        1. **Extract Information:** Only extract the information that directly matches the provided description: {description}. \
        2. **No Extra Content:** Do not include any additional text, comments, or explanations in your response. \
        3. **Empty Response:** If no information matches the description, return an empty string (''). \
        4. **Direct Data Only:** Your output should contain only the data that is explicitly requested, with no other text."
    )
}

/// Run the extraction prompt for a single chunk
///
/// # Returns
///
/// The text parts of the model's answer concatenated, or `""` when the model
/// returned no text
pub async fn extract_chunk<M>(model: &M, chunk: &str, description: &str) -> Result<String, ProcessError>
where
    M: CompletionModel,
{
    let prompt = build_extraction_prompt(chunk, description);
    let response = model.completion_request(prompt).send().await?;

    let text = response
        .choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<String>();
    Ok(text)
}

/// Extract the data matching `description` from `text`
///
/// # Arguments
///
/// * `model` - The completion model to call
/// * `text` - Cleaned page text, usually the combined text of a crawl
/// * `description` - What to extract, in plain words
/// * `max_length` - Maximum chunk length in characters
///
/// # Returns
///
/// Per-chunk results joined by a blank line, in chunk order
#[instrument(skip(model, text), fields(text_len = text.len()))]
pub async fn extract_insights<M>(
    model: &M,
    text: &str,
    description: &str,
    max_length: usize,
) -> Result<String, ProcessError>
where
    M: CompletionModel,
{
    if description.trim().is_empty() {
        return Err(ProcessError::InvalidArgument(
            "extraction description must not be empty".to_string(),
        ));
    }

    let chunks = chunk(text, max_length)?;
    let total = chunks.clone().count();
    info!("Extracting from {} chunks", total);

    let mut results = Vec::with_capacity(total);
    for (i, piece) in chunks.enumerate() {
        debug!("Processing chunk {} of {}", i + 1, total);
        match extract_chunk(model, piece, description).await {
            Ok(result) => results.push(result),
            Err(e) => warn!("Error processing chunk {}: {}", i + 1, e),
        }
    }

    Ok(results.join("\n\n"))
}
