//! Per-plan limits injected into the pipeline

use serde::{Deserialize, Serialize};

/// Input and output caps for a subscription plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    /// Canonical plan name
    pub name: String,

    /// Longest input accepted, in estimated tokens
    pub max_input_tokens: usize,

    /// Highest output cap a request may ask for
    pub max_output_cap: u32,

    /// Files a user may keep in total
    pub max_files_total: u32,

    /// Requests allowed per 24 hours
    pub ratelimit_24h: u32,
}

impl PlanLimits {
    /// Free tier
    pub fn free() -> Self {
        Self {
            name: "free".to_string(),
            max_input_tokens: 50_000,
            max_output_cap: 4_000,
            max_files_total: 3,
            ratelimit_24h: 10,
        }
    }

    /// Basic tier
    pub fn basic() -> Self {
        Self {
            name: "basic".to_string(),
            max_input_tokens: 150_000,
            max_output_cap: 8_000,
            max_files_total: 10,
            ratelimit_24h: 40,
        }
    }

    /// Premium tier
    pub fn premium() -> Self {
        Self {
            name: "premium".to_string(),
            max_input_tokens: 400_000,
            max_output_cap: 12_000,
            max_files_total: 20,
            ratelimit_24h: 100,
        }
    }

    /// Resolve a plan by name
    ///
    /// `pro` is an alias of `premium`. Unknown names resolve to `free`.
    pub fn for_plan(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "basic" => Self::basic(),
            "premium" | "pro" => Self::premium(),
            _ => Self::free(),
        }
    }

    /// Clamp a requested output cap to this plan
    pub fn clamp_output_cap(&self, requested: u32) -> u32 {
        requested.min(self.max_output_cap)
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::free()
    }
}
