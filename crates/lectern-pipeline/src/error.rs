//! Error types for the pipeline

use lectern_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while summarizing
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Generation backend error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Model output could not be coerced into JSON
    #[error("Unparsable model output: {0}")]
    UnparsableOutput(String),

    /// JSON parsed but did not fit the expected shape
    #[error("JSON error: {0}")]
    Json(String),

    /// Outline came back without any named section
    #[error("Outline has no sections")]
    EmptyOutline,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Json(e.to_string())
    }
}

impl PipelineError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Llm(e) if e.is_transient())
    }
}
