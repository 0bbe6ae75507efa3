//! Single entry point for every generation call
//!
//! The gateway owns the policies shared by all callers: default sampling,
//! the per-call timeout, one retry on truncated output, and usage recording.

use crate::{pricing, truncate_chars, Completion, CompletionParams, FinishReason, GenerationBackend, LlmError, TokenUsage};
use lectern_domain::{RequestId, UsageLedger, UsageRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Temperature used when a request does not set one
    pub temperature: f32,

    /// top_p used when a request does not set one
    pub top_p: f32,

    /// Multiplier applied to `max_tokens` on the truncation retry
    pub retry_growth: f64,

    /// Ceiling for the retried `max_tokens`
    pub max_retry_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            temperature: 0.2,
            top_p: 0.9,
            retry_growth: 1.2,
            max_retry_tokens: 16_000,
        }
    }
}

impl LlmSettings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.top_p) || self.top_p == 0.0 {
            return Err("top_p must be in (0.0, 1.0]".to_string());
        }
        if self.retry_growth < 1.0 {
            return Err("retry_growth must be >= 1.0".to_string());
        }
        Ok(())
    }

    /// Token budget for the truncation retry
    pub fn retry_budget(&self, max_tokens: u32) -> u32 {
        // The epsilon keeps 1000 * 1.2 from rounding up to 1201.
        let grown = (max_tokens as f64 * self.retry_growth - 1e-9).ceil() as u32;
        grown.min(self.max_retry_tokens)
    }
}

/// A prompt plus the call policy for it
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Logical endpoint recorded in the ledger
    pub endpoint: String,
    /// System prompt
    pub system: String,
    /// User prompt
    pub user: String,
    /// Output token limit
    pub max_tokens: u32,
    /// Overrides the default temperature
    pub temperature: Option<f32>,
    /// Overrides the default top_p
    pub top_p: Option<f32>,
    /// Retry once with a bigger budget when output is truncated
    pub allow_retry: bool,
    /// Caller identity for the ledger
    pub user_id: Option<String>,
    /// Request the call belongs to
    pub request_id: Option<RequestId>,
}

impl GenerationRequest {
    /// Create a request with default policy (truncation retry enabled)
    pub fn new(endpoint: impl Into<String>, system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            system: system.into(),
            user: user.into(),
            max_tokens,
            temperature: None,
            top_p: None,
            allow_retry: true,
            user_id: None,
            request_id: None,
        }
    }

    /// Enable or disable the truncation retry
    pub fn with_retry(mut self, allow_retry: bool) -> Self {
        self.allow_retry = allow_retry;
        self
    }

    /// Override the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach caller identity
    pub fn for_user(mut self, user_id: Option<String>, request_id: Option<RequestId>) -> Self {
        self.user_id = user_id;
        self.request_id = request_id;
        self
    }
}

/// Result of a gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Generated text
    pub text: String,
    /// Finish reason of the last backend call
    pub finish_reason: FinishReason,
    /// Usage summed over all backend calls
    pub usage: TokenUsage,
    /// Whether the truncation retry ran
    pub retried: bool,
}

impl Generation {
    /// Whether the final output was cut off by the token limit
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

/// Wraps a backend with timeout, truncation retry and usage recording
#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn GenerationBackend>,
    ledger: Option<Arc<dyn UsageLedger>>,
    settings: LlmSettings,
}

impl LlmGateway {
    /// Create a gateway with default settings and no ledger
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            ledger: None,
            settings: LlmSettings::default(),
        }
    }

    /// Use custom settings
    pub fn with_settings(mut self, settings: LlmSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Record usage through `ledger`
    pub fn with_ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Current settings
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Model name of the backend
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Run a generation
    ///
    /// # Errors
    ///
    /// - `LlmError::Timeout` if a backend call exceeds the timeout
    /// - `LlmError::Generation` for non-success responses
    /// - `LlmError::Transport` for network failures
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let mut params = CompletionParams {
            system: request.system.clone(),
            user: request.user.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature.unwrap_or(self.settings.temperature),
            top_p: request.top_p.unwrap_or(self.settings.top_p),
        };

        let first = self.call_once(request, &params).await?;
        let mut usage = first.usage;

        if first.completion.finish_reason != FinishReason::Length || !request.allow_retry {
            return Ok(Generation {
                text: first.completion.text,
                finish_reason: first.completion.finish_reason,
                usage,
                retried: false,
            });
        }

        let retry_budget = self.settings.retry_budget(request.max_tokens);
        info!(
            "{} output truncated at {} tokens, retrying with {}",
            request.endpoint, request.max_tokens, retry_budget
        );
        params.max_tokens = retry_budget;

        let second = self.call_once(request, &params).await?;
        usage = TokenUsage::new(
            usage.prompt_tokens.saturating_add(second.usage.prompt_tokens),
            usage.completion_tokens.saturating_add(second.usage.completion_tokens),
        );

        Ok(Generation {
            text: second.completion.text,
            finish_reason: second.completion.finish_reason,
            usage,
            retried: true,
        })
    }

    async fn call_once(&self, request: &GenerationRequest, params: &CompletionParams) -> Result<Attempt, LlmError> {
        let timeout = Duration::from_secs(self.settings.timeout_secs);
        debug!(
            "{} calling {} (max_tokens={})",
            request.endpoint,
            self.backend.model(),
            params.max_tokens
        );

        let completion = match tokio::time::timeout(timeout, self.backend.complete(params)).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(LlmError::Generation { status, body })) => {
                warn!("{} failed with status {}", request.endpoint, status);
                return Err(LlmError::Generation {
                    status,
                    body: truncate_chars(&body, crate::MAX_ERROR_BODY_CHARS),
                });
            }
            Ok(Err(LlmError::Timeout(_))) | Err(_) => {
                warn!("{} timed out after {}s", request.endpoint, self.settings.timeout_secs);
                return Err(LlmError::Timeout(self.settings.timeout_secs));
            }
            Ok(Err(e)) => {
                warn!("{} failed: {}", request.endpoint, e);
                return Err(e);
            }
        };

        let usage = completion.usage.unwrap_or_else(|| {
            TokenUsage::estimate(&format!("{}{}", params.system, params.user), &completion.text)
        });
        self.record_usage(request, usage);

        Ok(Attempt { completion, usage })
    }

    fn record_usage(&self, request: &GenerationRequest, usage: TokenUsage) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let model = self.backend.model();
        let cost = pricing::cost_usd(model, usage.prompt_tokens, usage.completion_tokens);
        let record = UsageRecord::new(
            request.endpoint.clone(),
            model,
            usage.prompt_tokens,
            usage.completion_tokens,
            cost,
        )
        .with_user(request.user_id.clone())
        .with_request(request.request_id);

        if let Err(e) = ledger.record(&record) {
            warn!("Failed to record usage for {}: {}", request.endpoint, e);
        }
    }
}

struct Attempt {
    completion: Completion,
    usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockBackend, MockReply};
    use lectern_domain::CollaboratorError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLedger {
        records: Mutex<Vec<UsageRecord>>,
    }

    impl UsageLedger for RecordingLedger {
        fn record(&self, record: &UsageRecord) -> Result<(), CollaboratorError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct BrokenLedger;

    impl UsageLedger for BrokenLedger {
        fn record(&self, _record: &UsageRecord) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Storage("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_default_sampling_applied() {
        let backend = MockBackend::new("ok");
        let gateway = LlmGateway::new(Arc::new(backend.clone()));
        gateway
            .generate(&GenerationRequest::new("t", "s", "u", 100))
            .await
            .unwrap();

        let call = &backend.calls()[0];
        assert!((call.temperature - 0.2).abs() < f32::EPSILON);
        assert!((call.top_p - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_truncation_retry_runs_once_with_grown_budget() {
        let backend = MockBackend::new("unused");
        backend.enqueue(MockReply::Truncated("partial".into()));
        backend.enqueue(MockReply::Truncated("still partial".into()));
        let gateway = LlmGateway::new(Arc::new(backend.clone()));

        let generation = gateway
            .generate(&GenerationRequest::new("t", "s", "u", 1_000))
            .await
            .unwrap();

        assert!(generation.retried);
        assert!(generation.is_truncated());
        assert_eq!(generation.text, "still partial");
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].max_tokens, 1_000);
        assert_eq!(calls[1].max_tokens, 1_200);
    }

    #[tokio::test]
    async fn test_retry_budget_capped() {
        let settings = LlmSettings::default();
        assert_eq!(settings.retry_budget(15_000), 16_000);
        assert_eq!(settings.retry_budget(999), 1_199);
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let backend = MockBackend::new("unused");
        backend.enqueue(MockReply::Truncated("partial".into()));
        let gateway = LlmGateway::new(Arc::new(backend.clone()));

        let generation = gateway
            .generate(&GenerationRequest::new("t", "s", "u", 100).with_retry(false))
            .await
            .unwrap();

        assert!(!generation.retried);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_returns_timeout_error() {
        let backend = MockBackend::new("slow").with_latency(Duration::from_millis(1_500));
        let settings = LlmSettings {
            timeout_secs: 1,
            ..Default::default()
        };
        let gateway = LlmGateway::new(Arc::new(backend)).with_settings(settings);

        let result = gateway.generate(&GenerationRequest::new("t", "s", "u", 10)).await;
        assert_eq!(result, Err(LlmError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_usage_recorded_per_backend_call() {
        let backend = MockBackend::new("unused");
        backend.enqueue(MockReply::Truncated("partial".into()));
        backend.enqueue(MockReply::text("complete"));
        let ledger = Arc::new(RecordingLedger::default());
        let gateway = LlmGateway::new(Arc::new(backend)).with_ledger(ledger.clone());

        let request = GenerationRequest::new("map", "s", "u", 100).for_user(Some("u-1".into()), None);
        gateway.generate(&request).await.unwrap();

        let records = ledger.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].endpoint, "map");
        assert_eq!(records[0].user_id.as_deref(), Some("u-1"));
        assert_eq!(records[0].model, "mock-model");
    }

    #[tokio::test]
    async fn test_ledger_failure_does_not_fail_generation() {
        let gateway = LlmGateway::new(Arc::new(MockBackend::new("fine"))).with_ledger(Arc::new(BrokenLedger));
        let generation = gateway
            .generate(&GenerationRequest::new("t", "s", "u", 10))
            .await
            .unwrap();
        assert_eq!(generation.text, "fine");
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let backend = MockBackend::new("unused");
        backend.enqueue(MockReply::Error(LlmError::generation(502, "bad gateway")));
        let gateway = LlmGateway::new(Arc::new(backend));

        let err = gateway
            .generate(&GenerationRequest::new("t", "s", "u", 10))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, LlmError::Generation { status: 502, .. }));
    }

    #[test]
    fn test_settings_validation() {
        assert!(LlmSettings::default().validate().is_ok());
        let bad = LlmSettings {
            retry_growth: 0.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
