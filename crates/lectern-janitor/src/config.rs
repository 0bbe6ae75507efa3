//! Configuration for Janitor operations
//!
//! Defines the cache eviction schedule and the deterministic cleanup rules.

use crate::JanitorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the cache janitor
///
/// # Examples
///
/// ```
/// use lectern_janitor::JanitorConfig;
///
/// let config = JanitorConfig::default();
/// assert_eq!(config.cache_ttl_days, 7);
///
/// let config = JanitorConfig::aggressive();
/// assert_eq!(config.cache_ttl_days, 1);
///
/// let config = JanitorConfig::lenient();
/// assert_eq!(config.cache_ttl_days, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Age after which cached responses are evicted (in days)
    /// Default: 7 days
    pub cache_ttl_days: u64,

    /// How often to run the sweep cycle (in minutes)
    /// Default: Every 60 minutes (hourly)
    pub sweep_interval_minutes: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_days: 7,
            sweep_interval_minutes: 60,
        }
    }
}

impl JanitorConfig {
    /// Aggressive eviction (short TTL, frequent sweeps)
    pub fn aggressive() -> Self {
        Self {
            cache_ttl_days: 1,
            sweep_interval_minutes: 15,
        }
    }

    /// Lenient eviction (long TTL, infrequent sweeps)
    pub fn lenient() -> Self {
        Self {
            cache_ttl_days: 30,
            sweep_interval_minutes: 240,
        }
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Get cache TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_days * 86_400)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.sweep_interval_minutes == 0 {
            return Err(JanitorError::Config(
                "sweep_interval_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, JanitorError> {
        let config: Self = toml::from_str(s).map_err(|e| JanitorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, JanitorError> {
        toml::to_string(self).map_err(|e| JanitorError::Config(e.to_string()))
    }
}

/// Rules applied by the quality enforcer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcerConfig {
    /// Vague phrases stripped from examples (matched case-insensitively)
    pub filler_phrases: Vec<String>,

    /// Maximum sentences kept per concept example
    pub max_example_sentences: usize,

    /// Similarity at or above which two sentences count as duplicates (0.0-1.0)
    pub near_duplicate_threshold: f64,

    /// Maximum length of citation evidence (in characters)
    pub max_evidence_chars: usize,

    /// Maximum missing topics kept on the coverage report
    pub max_missing_topics: usize,

    /// Maximum key points derived from a concept definition
    pub max_derived_key_points: usize,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            filler_phrases: [
                "imagine a scenario where",
                "imagine a scenario in which",
                "imagine a scenario",
                "imagine that",
                "picture this",
                "let's say",
                "let us say",
                "in a hypothetical situation",
                "hypothetically speaking",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_example_sentences: 2,
            near_duplicate_threshold: 0.9,
            max_evidence_chars: 200,
            max_missing_topics: 20,
            max_derived_key_points: 3,
        }
    }
}

impl EnforcerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.max_example_sentences == 0 {
            return Err(JanitorError::Config(
                "max_example_sentences must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.near_duplicate_threshold) {
            return Err(JanitorError::Config(
                "near_duplicate_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.filler_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(JanitorError::Config("filler_phrases must not contain blanks".to_string()));
        }
        Ok(())
    }
}
