//! Error types for the processor module

use crate::error::Error as CrateError;
use rig::completion::CompletionError;
use thiserror::Error;

/// Error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Invalid caller-supplied argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::InvalidArgument(msg) => CrateError::InvalidArgument(msg),
            _ => CrateError::Process(err.to_string()),
        }
    }
}

impl From<CompletionError> for ProcessError {
    fn from(err: CompletionError) -> Self {
        Self::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_into_crate_error() {
        let err: CrateError = ProcessError::InvalidArgument("max_length".to_string()).into();
        assert!(matches!(err, CrateError::InvalidArgument(msg) if msg == "max_length"));

        let err: CrateError = ProcessError::Llm("quota".to_string()).into();
        assert!(matches!(err, CrateError::Process(msg) if msg == "LLM error: quota"));

        let err: ProcessError = CompletionError::ProviderError("down".to_string()).into();
        assert!(matches!(err, ProcessError::Llm(_)));
    }
}
