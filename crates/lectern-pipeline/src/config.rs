//! Configuration for the summarization pipeline

use crate::error::PipelineError;
use lectern_domain::{DocumentDomain, PlanLimits};
use lectern_gatekeeper::{CoverageConfig, ValidationConfig};
use lectern_janitor::EnforcerConfig;
use lectern_llm::LlmSettings;
use serde::{Deserialize, Serialize};

/// Chunking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Characters per estimated token
    pub chars_per_token: usize,

    /// Token size a chunk grows towards
    pub target_tokens: usize,

    /// A chunk is never closed below this size
    pub min_chunk_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            target_tokens: 1_500,
            min_chunk_tokens: 400,
        }
    }
}

impl ChunkConfig {
    /// Estimated token count of `text`
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token.max(1)
    }

    /// Estimated token count of `chars` characters
    pub fn tokens_for_chars(&self, chars: usize) -> usize {
        chars / self.chars_per_token.max(1)
    }
}

/// Token budgets for MAP calls and the merge fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Base MAP budget per chunk
    pub base_tokens: u32,

    /// Added when the chunk carries formula signals
    pub formula_boost: u32,

    /// Added when the chunk carries proof or algorithm signals
    pub proof_boost: u32,

    /// Upper bound for a MAP budget
    pub max_tokens: u32,

    /// Minimum merge allocation per concept
    pub concept_floor: u32,

    /// Minimum merge allocation per formula
    pub formula_floor: u32,

    /// Minimum merge allocation per theorem
    pub theorem_floor: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            base_tokens: 1_800,
            formula_boost: 600,
            proof_boost: 600,
            max_tokens: 3_200,
            concept_floor: 120,
            formula_floor: 160,
            theorem_floor: 200,
        }
    }
}

/// REDUCE stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Cap on the aggregated knowledge JSON sent to the model
    pub knowledge_char_limit: usize,

    /// Estimated output tokens per section, technical documents
    pub per_section_cost_technical: u32,

    /// Estimated output tokens per section, other documents
    pub per_section_cost_other: u32,

    /// Token limit for outline calls
    pub outline_max_tokens: u32,

    /// Retries of a two-stage call after a transient error
    pub transient_retries: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            knowledge_char_limit: 150_000,
            per_section_cost_technical: 900,
            per_section_cost_other: 750,
            outline_max_tokens: 2_000,
            transient_retries: 1,
        }
    }
}

impl ReduceConfig {
    /// Per-section output cost for a document domain
    pub fn per_section_cost(&self, domain: DocumentDomain) -> u32 {
        match domain {
            DocumentDomain::Technical => self.per_section_cost_technical,
            _ => self.per_section_cost_other,
        }
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chunking
    pub chunk: ChunkConfig,

    /// MAP and merge budgets
    pub budget: BudgetConfig,

    /// REDUCE stage
    pub reduce: ReduceConfig,

    /// Gateway policy
    pub llm: LlmSettings,

    /// Document validation during REDUCE
    pub validation: ValidationConfig,

    /// Coverage measurement
    pub coverage: CoverageConfig,

    /// Final cleanup
    pub enforcer: EnforcerConfig,

    /// Plan tier limits
    pub plan: PlanLimits,

    /// MAP calls in flight at once
    pub map_concurrency: usize,

    /// Inputs up to this many estimated tokens are summarized in one call
    pub single_pass_max_tokens: usize,

    /// Inputs over this many estimated tokens get compact-style output prompts
    pub density_boost_tokens: usize,

    /// Characters of raw chunk text kept in a fallback concept
    pub fallback_chars: usize,
}

impl Default for PipelineConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            budget: BudgetConfig::default(),
            reduce: ReduceConfig::default(),
            llm: LlmSettings::default(),
            validation: ValidationConfig::default(),
            coverage: CoverageConfig::default(),
            enforcer: EnforcerConfig::default(),
            plan: PlanLimits::default(),
            map_concurrency: 1,
            single_pass_max_tokens: 6_000,
            density_boost_tokens: 30_000,
            fallback_chars: 600,
        }
    }
}

impl PipelineConfig {
    /// Aggressive preset: smaller chunks and lower quality bars for faster runs
    pub fn aggressive() -> Self {
        Self {
            chunk: ChunkConfig {
                target_tokens: 1_000,
                min_chunk_tokens: 250,
                ..ChunkConfig::default()
            },
            validation: ValidationConfig::permissive(),
            coverage: CoverageConfig {
                coverage_threshold: 0.7,
                ..CoverageConfig::default()
            },
            map_concurrency: 4,
            single_pass_max_tokens: 4_000,
            density_boost_tokens: 20_000,
            ..Self::default()
        }
    }

    /// Thorough preset: larger chunks and stricter validation
    pub fn thorough() -> Self {
        Self {
            chunk: ChunkConfig {
                target_tokens: 2_000,
                min_chunk_tokens: 600,
                ..ChunkConfig::default()
            },
            validation: ValidationConfig::strict(),
            coverage: CoverageConfig {
                coverage_threshold: 0.9,
                ..CoverageConfig::default()
            },
            single_pass_max_tokens: 8_000,
            density_boost_tokens: 45_000,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk.chars_per_token == 0 {
            return Err(PipelineError::Config("chars_per_token must be greater than 0".to_string()));
        }
        if self.chunk.target_tokens == 0 {
            return Err(PipelineError::Config("target_tokens must be greater than 0".to_string()));
        }
        if self.chunk.min_chunk_tokens > self.chunk.target_tokens {
            return Err(PipelineError::Config(
                "min_chunk_tokens cannot exceed target_tokens".to_string(),
            ));
        }
        if self.budget.base_tokens > self.budget.max_tokens {
            return Err(PipelineError::Config("base_tokens cannot exceed max_tokens".to_string()));
        }
        if self.reduce.per_section_cost_technical == 0 || self.reduce.per_section_cost_other == 0 {
            return Err(PipelineError::Config("per-section costs must be greater than 0".to_string()));
        }
        if self.reduce.knowledge_char_limit < 2 {
            return Err(PipelineError::Config("knowledge_char_limit is too small".to_string()));
        }
        if self.density_boost_tokens < self.single_pass_max_tokens {
            return Err(PipelineError::Config(
                "density_boost_tokens cannot be below single_pass_max_tokens".to_string(),
            ));
        }
        if self.map_concurrency == 0 {
            return Err(PipelineError::Config("map_concurrency must be greater than 0".to_string()));
        }
        self.llm.validate().map_err(PipelineError::Config)?;
        self.validation
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        self.coverage
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        self.enforcer
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml_str).map_err(|e| PipelineError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
