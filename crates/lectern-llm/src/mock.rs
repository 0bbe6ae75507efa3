//! Deterministic mock backend for testing

use crate::{Completion, CompletionParams, FinishReason, GenerationBackend, LlmError, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Complete normally with this text
    Text(String),
    /// Complete with this text but report `finish_reason = length`
    Truncated(String),
    /// Fail with this error
    Error(LlmError),
}

impl MockReply {
    /// Shorthand for a normal text reply
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }
}

#[derive(Debug)]
struct Rule {
    needle: String,
    replies: VecDeque<MockReply>,
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<Rule>,
    queue: VecDeque<MockReply>,
    calls: Vec<CompletionParams>,
}

/// Mock backend that returns scripted replies without network calls
///
/// Reply selection, in order:
/// 1. the first rule whose substring occurs in the system or user prompt
///    (a rule with several replies hands them out in order, then repeats its last);
/// 2. the next reply in the FIFO queue;
/// 3. the default reply.
///
/// Clones share state, so a test can keep a handle after moving the backend
/// into a gateway.
///
/// # Examples
///
/// ```
/// use lectern_llm::{MockBackend, MockReply};
///
/// let backend = MockBackend::new("{}");
/// backend.on("OUTLINE", MockReply::text(r#"{"title": "T", "sections": []}"#));
/// assert_eq!(backend.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    default_reply: MockReply,
    model: String,
    latency: Option<Duration>,
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    /// Create a mock that answers every prompt with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_reply: MockReply::Text(response.into()),
            model: "mock-model".to_string(),
            latency: None,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Set the model name reported to the gateway
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep this long before every reply
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a reply for prompts containing `needle`
    ///
    /// Calling `on` again with the same needle appends another reply to that rule.
    pub fn on(&self, needle: impl Into<String>, reply: MockReply) {
        let needle = needle.into();
        let mut state = self.lock();
        match state.rules.iter_mut().find(|r| r.needle == needle) {
            Some(rule) => rule.replies.push_back(reply),
            None => state.rules.push(Rule {
                needle,
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Queue a reply for the next call that matches no rule
    pub fn enqueue(&self, reply: MockReply) {
        self.lock().queue.push_back(reply);
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of calls whose prompt contained `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.system.contains(needle) || c.user.contains(needle))
            .count()
    }

    /// Parameters of every call, in order
    pub fn calls(&self) -> Vec<CompletionParams> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, params: &CompletionParams) -> MockReply {
        let mut state = self.lock();
        state.calls.push(params.clone());

        let matched = state
            .rules
            .iter_mut()
            .find(|r| params.system.contains(&r.needle) || params.user.contains(&r.needle));
        if let Some(rule) = matched {
            let reply = if rule.replies.len() > 1 {
                rule.replies.pop_front()
            } else {
                rule.replies.front().cloned()
            };
            if let Some(reply) = reply {
                return reply;
            }
        }

        state
            .queue
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn complete(&self, params: &CompletionParams) -> Result<Completion, LlmError> {
        let reply = self.select(params);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let prompt = format!("{}{}", params.system, params.user);
        match reply {
            MockReply::Text(text) => Ok(Completion {
                usage: Some(TokenUsage::estimate(&prompt, &text)),
                text,
                finish_reason: FinishReason::Stop,
            }),
            MockReply::Truncated(text) => Ok(Completion {
                usage: Some(TokenUsage::estimate(&prompt, &text)),
                text,
                finish_reason: FinishReason::Length,
            }),
            MockReply::Error(err) => Err(err),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(user: &str) -> CompletionParams {
        CompletionParams {
            system: "system".to_string(),
            user: user.to_string(),
            max_tokens: 100,
            temperature: 0.2,
            top_p: 0.9,
        }
    }

    #[tokio::test]
    async fn test_mock_backend_default() {
        let backend = MockBackend::new("Test response");
        let completion = backend.complete(&params("any prompt")).await.unwrap();
        assert_eq!(completion.text, "Test response");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_rules_match_by_substring() {
        let backend = MockBackend::default();
        backend.on("hello", MockReply::text("world"));
        backend.on("foo", MockReply::text("bar"));

        assert_eq!(backend.complete(&params("say hello")).await.unwrap().text, "world");
        assert_eq!(backend.complete(&params("foo?")).await.unwrap().text, "bar");
        assert_eq!(
            backend.complete(&params("unknown")).await.unwrap().text,
            "Default mock response"
        );
    }

    #[tokio::test]
    async fn test_rule_replies_in_order_then_repeat_last() {
        let backend = MockBackend::default();
        backend.on("FILL", MockReply::Error(LlmError::Timeout(1)));
        backend.on("FILL", MockReply::text("ok"));

        assert!(backend.complete(&params("FILL")).await.is_err());
        assert_eq!(backend.complete(&params("FILL")).await.unwrap().text, "ok");
        assert_eq!(backend.complete(&params("FILL")).await.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let backend = MockBackend::new("default");
        backend.enqueue(MockReply::text("first"));
        backend.enqueue(MockReply::Truncated("second".into()));

        assert_eq!(backend.complete(&params("a")).await.unwrap().text, "first");
        let second = backend.complete(&params("b")).await.unwrap();
        assert_eq!(second.finish_reason, FinishReason::Length);
        assert_eq!(backend.complete(&params("c")).await.unwrap().text, "default");
    }

    #[tokio::test]
    async fn test_clones_share_call_count() {
        let backend1 = MockBackend::new("test");
        let backend2 = backend1.clone();

        backend1.complete(&params("MAP chunk")).await.unwrap();

        assert_eq!(backend1.call_count(), 1);
        assert_eq!(backend2.call_count(), 1);
        assert_eq!(backend2.calls_matching("MAP"), 1);

        backend2.reset_call_count();
        assert_eq!(backend1.call_count(), 0);
    }
}
