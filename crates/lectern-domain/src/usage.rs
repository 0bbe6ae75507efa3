//! Token-usage records written to the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier tying the generation calls of one request together
///
/// Uses UUIDv7 so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new request ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ledger row per successful backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Request the call belonged to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,

    /// Caller identity, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Logical endpoint ("map", "reduce.fill", ...)
    pub endpoint: String,

    /// Model name reported to the backend
    pub model: String,

    /// Prompt tokens
    pub input_tokens: u32,

    /// Completion tokens
    pub output_tokens: u32,

    /// Total tokens
    pub total_tokens: u32,

    /// Cost in USD
    pub cost: f64,

    /// Unix timestamp in seconds
    pub recorded_at: u64,
}

impl UsageRecord {
    /// Build a record stamped with the current time
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, input_tokens: u32, output_tokens: u32, cost: f64) -> Self {
        Self {
            request_id: None,
            user_id: None,
            endpoint: endpoint.into(),
            model: model.into(),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            cost,
            recorded_at: unix_now(),
        }
    }

    /// Attach the caller identity
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Attach the request ID
    pub fn with_request(mut self, request_id: Option<RequestId>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Seconds since the Unix epoch (0 if the clock is before it)
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_tokens_summed() {
        let record = UsageRecord::new("map", "gpt-4o-mini", 100, 50, 0.01);
        assert_eq!(record.total_tokens, 150);
        assert!(record.recorded_at > 0);
    }

    #[test]
    fn test_request_ids_are_ordered() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert!(a.as_uuid() <= b.as_uuid());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = UsageRecord::new("map", "m", 1, 2, 0.0).with_user(Some("u1".to_string()));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"userId\":\"u1\""));
        assert!(json.contains("\"totalTokens\":3"));
        assert!(!json.contains("requestId"));
    }
}
