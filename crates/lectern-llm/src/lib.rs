//! Lectern LLM Provider Layer
//!
//! Pluggable generation backends behind a single gateway.
//!
//! # Architecture
//!
//! `GenerationBackend` is the seam between the pipeline and a concrete model
//! API. `LlmGateway` wraps any backend with timeouts, one truncation retry and
//! usage recording through the `UsageLedger` observer from `lectern-domain`.
//!
//! # Backends
//!
//! - `MockBackend`: Scripted, deterministic backend for testing
//! - `OpenAiBackend`: Any OpenAI-compatible `/chat/completions` API
//!
//! # Examples
//!
//! ```
//! use lectern_llm::{GenerationRequest, LlmGateway, MockBackend};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = MockBackend::new("Hello from LLM!");
//! let gateway = LlmGateway::new(Arc::new(backend));
//! let request = GenerationRequest::new("demo", "You are terse.", "Say hello", 64);
//! let generation = gateway.generate(&request).await.unwrap();
//! assert_eq!(generation.text, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod gateway;
pub mod mock;
pub mod openai;
pub mod pricing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gateway::{Generation, GenerationRequest, LlmGateway, LlmSettings};
pub use mock::{MockBackend, MockReply};
pub use openai::OpenAiBackend;

/// Longest backend error body kept in an error value
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// The backend answered with a non-success status
    #[error("Generation failed with status {status}: {body}")]
    Generation {
        /// HTTP-style status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The call did not finish within the configured timeout
    #[error("Generation timed out after {0}s")]
    Timeout(u64),

    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with something that is not a completion
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Build a generation error, truncating the body
    pub fn generation(status: u16, body: &str) -> Self {
        LlmError::Generation {
            status,
            body: truncate_chars(body, MAX_ERROR_BODY_CHARS),
        }
    }

    /// Whether retrying the same call may succeed
    ///
    /// Timeouts, rate limits, server errors and network failures are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::Transport(_) => true,
            LlmError::Generation { status, .. } => *status == 429 || *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::Other(_) => false,
        }
    }
}

/// Why the backend stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// Natural end of output
    #[default]
    Stop,
    /// Hit the token limit
    Length,
    /// Anything else the backend reported
    Other,
}

impl FinishReason {
    /// Map a backend-reported reason string
    pub fn parse(s: &str) -> Self {
        match s {
            "stop" | "end_turn" | "eos" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }
}

/// Token counts reported for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build from prompt and completion counts
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Rough estimate from character counts (4 chars per token)
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let est = |s: &str| (s.chars().count() / 4) as u32;
        Self::new(est(prompt), est(completion))
    }
}

/// Parameters for a single backend call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    /// System prompt
    pub system: String,
    /// User prompt
    pub user: String,
    /// Output token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
}

/// Result of a single backend call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Reported token usage, if the backend provides it
    pub usage: Option<TokenUsage>,
}

/// A model API that turns a prompt into text
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one completion
    async fn complete(&self, params: &CompletionParams) -> Result<Completion, LlmError>;

    /// Model name used for pricing and the ledger
    fn model(&self) -> &str;
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
