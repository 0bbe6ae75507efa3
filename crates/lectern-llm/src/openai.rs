//! OpenAI-compatible Backend Implementation
//!
//! Talks to any server exposing the `/chat/completions` API (OpenAI,
//! OpenRouter, vLLM, llama.cpp server, Ollama's compatibility layer).
//!
//! # Features
//!
//! - Async HTTP communication via reqwest
//! - Bearer-token authentication
//! - JSON response mode
//!
//! Retries and timeouts are the gateway's job; this backend makes exactly one
//! request per call.
//!
//! # Examples
//!
//! ```no_run
//! use lectern_llm::OpenAiBackend;
//!
//! let backend = OpenAiBackend::new("https://api.openai.com/v1", "gpt-4o-mini")
//!     .unwrap()
//!     .with_api_key("sk-...");
//! ```

use crate::{Completion, CompletionParams, FinishReason, GenerationBackend, LlmError, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Backend for OpenAI-compatible chat completion APIs
pub struct OpenAiBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    json_mode: bool,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    /// Content can be null when the model refuses
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiBackend {
    /// Create a backend for `endpoint` (the base URL, without `/chat/completions`)
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            json_mode: true,
            client,
        })
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Toggle `response_format = json_object` (some local servers reject it)
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, params: &CompletionParams) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &params.system,
                },
                Message {
                    role: "user",
                    content: &params.user,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stream: false,
            response_format: self.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let mut request = self.client.post(self.url()).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(0)
            } else {
                LlmError::Transport(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::generation(status.as_u16(), &error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))?;

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::parse)
            .unwrap_or_default();
        debug!("{} finished with {:?}", self.model, finish_reason);

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage: chat
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
