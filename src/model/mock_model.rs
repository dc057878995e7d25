//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! for use in tests. Responses are scripted in call order, so a test can make
//! one chunk succeed and the next fail without making actual API calls.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// A mock completion model for testing purposes.
///
/// Each `completion` call pops the next scripted outcome. Once the script is
/// exhausted it answers with an empty text response.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionModel {
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    /// Creates a new mock model with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful text response.
    pub async fn push_text(&self, text: &str) {
        self.script.lock().await.push_back(Ok(text.to_string()));
    }

    /// Queue a provider failure.
    pub async fn push_error(&self, message: &str) {
        self.script.lock().await.push_back(Err(message.to_string()));
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().await.pop_front();
        match next {
            Some(Ok(text)) => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(&text)),
                raw_response: text,
            }),
            Some(Err(message)) => Err(CompletionError::ProviderError(message)),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: String::new(),
            }),
        }
    }
}
