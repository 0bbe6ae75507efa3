//! End-to-end orchestration
//!
//! `Summarizer` is the boundary the outer surfaces call. It never returns an
//! error: a total failure is reported as [`FinalDocument::failure`].

use crate::chunking::TextChunker;
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::map::{aggregate, MapPhase};
use crate::prompt::{coverage_hint_instruction, PromptBuilder, PromptKind};
use crate::reduce::{parse_document, ReducePipeline, ReduceStrategy};
use lectern_domain::{AggregatedKnowledge, Coverage, DocumentDomain, FinalDocument, ResponseCache};
use lectern_gatekeeper::classify::detect_document_domain;
use lectern_gatekeeper::CoverageValidator;
use lectern_janitor::{CleanupMetrics, QualityEnforcer};
use lectern_llm::LlmGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request to summarize one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    /// Full document text
    pub full_text: String,

    /// Output language
    #[serde(default = "default_language")]
    pub language: String,

    /// Free-form caller instructions
    #[serde(default)]
    pub extra_instructions: String,

    /// Requested output cap in tokens (0 means the plan maximum)
    #[serde(default)]
    pub output_cap: u32,

    /// Use map-reduce even for small inputs
    #[serde(default)]
    pub force_chunking: bool,

    /// Caller identity for the usage ledger
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_language() -> String {
    "English".to_string()
}

impl SummarizeRequest {
    /// Create a request with default options
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            language: default_language(),
            extra_instructions: String::new(),
            output_cap: 0,
            force_chunking: false,
            user_id: None,
        }
    }

    /// Set the output language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set caller instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = instructions.into();
        self
    }

    /// Set the requested output cap
    pub fn with_output_cap(mut self, output_cap: u32) -> Self {
        self.output_cap = output_cap;
        self
    }

    /// Force map-reduce
    pub fn with_force_chunking(mut self, force_chunking: bool) -> Self {
        self.force_chunking = force_chunking;
        self
    }

    /// Attach caller identity
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// How the delivered document was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryStrategy {
    /// One call over the whole document
    SinglePass,
    /// MAP then outline-and-fill REDUCE
    TwoStage,
    /// MAP then the merge fallback
    SingleStage,
    /// Generated from a topic with no source text
    Topic,
    /// Served from the response cache
    Cached,
    /// Every strategy failed
    Failed,
}

impl From<ReduceStrategy> for SummaryStrategy {
    fn from(strategy: ReduceStrategy) -> Self {
        match strategy {
            ReduceStrategy::TwoStage => SummaryStrategy::TwoStage,
            ReduceStrategy::SingleStage => SummaryStrategy::SingleStage,
        }
    }
}

/// What a summarization call returns
#[derive(Debug, Clone)]
pub struct SummaryResponse {
    /// Rendered, pruned document JSON
    pub json: Value,

    /// The cleaned document
    pub document: FinalDocument,

    /// Strategy that produced the document
    pub strategy: SummaryStrategy,

    /// Detected document domain
    pub domain: DocumentDomain,

    /// Chunks sent through MAP (0 for single pass)
    pub chunk_count: usize,

    /// Chunks that fell back to placeholder knowledge
    pub degraded_chunks: usize,

    /// A coverage-driven regeneration ran
    pub regenerated: bool,

    /// Served from the response cache
    pub cache_hit: bool,

    /// Changes made by the quality enforcer
    pub cleanup: CleanupMetrics,
}

impl SummaryResponse {
    /// Coverage attached to the document, if measured
    pub fn coverage(&self) -> Option<&Coverage> {
        self.document.coverage.as_ref()
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.json).unwrap_or_else(|_| self.json.to_string())
    }
}

/// Inputs that identify a cacheable response
///
/// Field order is fixed, so the serialized form is canonical.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey<'a> {
    /// Source text (or topic)
    pub text: &'a str,
    /// Output language
    pub language: &'a str,
    /// Caller instructions
    pub extra_instructions: &'a str,
    /// Clamped output cap
    pub output_cap: u32,
    /// Forced map-reduce
    pub force_chunking: bool,
    /// "source" or "topic"
    pub mode: &'a str,
}

impl CacheKey<'_> {
    /// SHA-256 hex digest of the canonical JSON
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}

enum Route<'a> {
    SinglePass(&'a str),
    MapReduce(AggregatedKnowledge),
}

struct Produced {
    document: FinalDocument,
    strategy: SummaryStrategy,
    domain: DocumentDomain,
    chunk_count: usize,
    degraded_chunks: usize,
    regenerated: bool,
}

impl Produced {
    fn new(document: FinalDocument, strategy: SummaryStrategy, domain: DocumentDomain) -> Self {
        Self {
            document,
            strategy,
            domain,
            chunk_count: 0,
            degraded_chunks: 0,
            regenerated: false,
        }
    }
}

/// Summarizes documents end to end
pub struct Summarizer {
    gateway: LlmGateway,
    config: PipelineConfig,
    chunker: TextChunker,
    map: MapPhase,
    reduce: ReducePipeline,
    coverage: CoverageValidator,
    enforcer: QualityEnforcer,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl Summarizer {
    /// Create a summarizer, validating the configuration
    ///
    /// The configuration's LLM settings replace the gateway's.
    pub fn new(gateway: LlmGateway, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let gateway = gateway.with_settings(config.llm.clone());
        let enforcer = QualityEnforcer::new(config.enforcer.clone()).map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(Self {
            chunker: TextChunker::new(config.chunk.clone()),
            map: MapPhase::new(gateway.clone(), &config),
            reduce: ReducePipeline::new(gateway.clone(), &config),
            coverage: CoverageValidator::new(config.coverage.clone()),
            enforcer,
            gateway,
            config,
            cache: None,
        })
    }

    /// Serve and store responses through `cache`
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Summarize a document
    pub async fn summarize(&self, request: SummarizeRequest) -> SummaryResponse {
        let output_cap = self.output_cap(request.output_cap);
        let text = self.fit_input(&request.full_text);
        let key = CacheKey {
            text,
            language: &request.language,
            extra_instructions: &request.extra_instructions,
            output_cap,
            force_chunking: request.force_chunking,
            mode: "source",
        }
        .digest();

        let domain = detect_document_domain(text);
        if let Some(hit) = self.cached(&key, domain) {
            return hit;
        }

        if text.trim().is_empty() {
            let failure = FinalDocument::failure("The document contains no text.");
            return self.finish(Produced::new(failure, SummaryStrategy::Failed, domain), None);
        }

        let estimated = self.config.chunk.estimate_tokens(text);
        let ctx = RunContext::new(request.language.as_str(), output_cap)
            .with_instruction(request.extra_instructions.as_str())
            .with_user(request.user_id.clone())
            .with_domain(domain)
            .with_density(estimated, self.config.density_boost_tokens);

        let single_pass = !request.force_chunking && estimated <= self.config.single_pass_max_tokens;
        info!(
            "Summarizing ~{} tokens ({} domain) via {}",
            estimated,
            domain,
            if single_pass { "single pass" } else { "map-reduce" }
        );
        if ctx.density_boost {
            debug!("Input over {} tokens, asking for compact output", self.config.density_boost_tokens);
        }

        let mut produced = Produced::new(FinalDocument::default(), SummaryStrategy::Failed, domain);
        let route = if single_pass {
            Route::SinglePass(text)
        } else {
            let chunks = self.chunker.chunk_document(text);
            let results = self.map.run(&chunks, &ctx).await;
            produced.chunk_count = chunks.len();
            produced.degraded_chunks = results.iter().filter(|r| r.degraded()).count();
            Route::MapReduce(aggregate(&results))
        };

        match self.synthesize(&route, &ctx).await {
            Ok((document, strategy)) => {
                let source_topics = self.coverage.source_topics(text);
                let (document, strategy, regenerated) = self
                    .check_coverage(document, strategy, &route, &ctx, &source_topics)
                    .await;
                produced.document = document;
                produced.strategy = strategy;
                produced.regenerated = regenerated;
                self.finish(produced, Some(&key))
            }
            Err(e) => {
                warn!("Summarization failed: {}", e);
                produced.document = FinalDocument::failure(format!("Summarization failed: {}", e));
                self.finish(produced, None)
            }
        }
    }

    /// Write a study guide from a topic alone
    pub async fn summarize_without_source(&self, topic: &str, language: &str, output_cap: u32) -> SummaryResponse {
        let output_cap = self.output_cap(output_cap);
        let domain = detect_document_domain(topic);
        let key = CacheKey {
            text: topic,
            language,
            extra_instructions: "",
            output_cap,
            force_chunking: false,
            mode: "topic",
        }
        .digest();
        if let Some(hit) = self.cached(&key, domain) {
            return hit;
        }

        if topic.trim().is_empty() {
            let failure = FinalDocument::failure("No topic was given.");
            return self.finish(Produced::new(failure, SummaryStrategy::Failed, domain), None);
        }

        let ctx = RunContext::new(language, output_cap).with_domain(domain);
        let builder = ctx.prompt(PromptKind::Topic).with_part("Topic", topic.trim());
        match self.generate_document(&builder, &ctx).await {
            Ok(document) => self.finish(Produced::new(document, SummaryStrategy::Topic, domain), Some(&key)),
            Err(e) => {
                warn!("Topic summary failed: {}", e);
                let failure = FinalDocument::failure(format!("Summarization failed: {}", e));
                self.finish(Produced::new(failure, SummaryStrategy::Failed, domain), None)
            }
        }
    }

    fn output_cap(&self, requested: u32) -> u32 {
        let plan = &self.config.plan;
        if requested == 0 {
            plan.max_output_cap
        } else {
            plan.clamp_output_cap(requested)
        }
    }

    fn fit_input<'a>(&self, text: &'a str) -> &'a str {
        let max_chars = self.config.plan.max_input_tokens.saturating_mul(self.config.chunk.chars_per_token);
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => {
                warn!(
                    "Input exceeds the {} plan limit of {} tokens, truncating",
                    self.config.plan.name, self.config.plan.max_input_tokens
                );
                &text[..cut]
            }
            None => text,
        }
    }

    async fn synthesize(&self, route: &Route<'_>, ctx: &RunContext) -> Result<(FinalDocument, SummaryStrategy), PipelineError> {
        match route {
            Route::SinglePass(text) => {
                let builder = ctx.prompt(PromptKind::SinglePass).with_part("Document", *text);
                let document = self.generate_document(&builder, ctx).await?;
                Ok((document, SummaryStrategy::SinglePass))
            }
            Route::MapReduce(knowledge) => {
                let outcome = self.reduce.run(knowledge, ctx).await?;
                Ok((outcome.document, outcome.strategy.into()))
            }
        }
    }

    async fn check_coverage(
        &self,
        mut document: FinalDocument,
        mut strategy: SummaryStrategy,
        route: &Route<'_>,
        ctx: &RunContext,
        source_topics: &[String],
    ) -> (FinalDocument, SummaryStrategy, bool) {
        let mut coverage = self.coverage.measure(source_topics, &document);
        if !self.coverage.needs_regeneration(&coverage) {
            document.coverage = Some(coverage);
            return (document, strategy, false);
        }

        let hints = self.coverage.hint_topics(&coverage);
        info!(
            "Coverage {:.2} below {:.2}, regenerating once with {} hint topics",
            coverage.score,
            self.coverage.config().coverage_threshold,
            hints.len()
        );
        let retry_ctx = ctx.clone().with_instruction(coverage_hint_instruction(&hints));
        match self.synthesize(route, &retry_ctx).await {
            Ok((regenerated, new_strategy)) => {
                coverage = self.coverage.measure(source_topics, &regenerated);
                document = regenerated;
                strategy = new_strategy;
            }
            Err(e) => warn!("Regeneration failed, keeping first document: {}", e),
        }
        document.coverage = Some(coverage);
        (document, strategy, true)
    }

    async fn generate_document(&self, builder: &PromptBuilder, ctx: &RunContext) -> Result<FinalDocument, PipelineError> {
        let generation = self.gateway.generate(&ctx.request(builder, ctx.output_cap)).await?;
        let document = parse_document(&generation.text)?;
        if document.summary.sections.is_empty() {
            return Err(PipelineError::Json("document has no sections".to_string()));
        }
        Ok(document)
    }

    fn cached(&self, key: &str, domain: DocumentDomain) -> Option<SummaryResponse> {
        let cache = self.cache.as_ref()?;
        let stored = match cache.get(key) {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("Cache lookup failed, continuing without cache: {}", e);
                return None;
            }
        };
        let json: Value = match serde_json::from_str(&stored) {
            Ok(json) => json,
            Err(e) => {
                warn!("Ignoring undecodable cache entry: {}", e);
                return None;
            }
        };
        let document: FinalDocument = serde_json::from_value(json.clone()).ok()?;
        debug!("Cache hit for {}", key);
        Some(SummaryResponse {
            json,
            document,
            strategy: SummaryStrategy::Cached,
            domain,
            chunk_count: 0,
            degraded_chunks: 0,
            regenerated: false,
            cache_hit: true,
            cleanup: CleanupMetrics::new(),
        })
    }

    fn finish(&self, produced: Produced, cache_key: Option<&str>) -> SummaryResponse {
        let (document, cleanup) = self.enforcer.enforce(produced.document);
        let json = self.enforcer.render(&document);
        if !cleanup.is_clean() {
            debug!("Enforcer: {}", cleanup.summary());
        }

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            if !document.is_failure() {
                if let Err(e) = cache.set(key, &json.to_string()) {
                    warn!("Failed to cache response: {}", e);
                }
            }
        }

        SummaryResponse {
            json,
            document,
            strategy: produced.strategy,
            domain: produced.domain,
            chunk_count: produced.chunk_count,
            degraded_chunks: produced.degraded_chunks,
            regenerated: produced.regenerated,
            cache_hit: false,
            cleanup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str, mode: &str) -> String {
        CacheKey {
            text,
            language: "English",
            extra_instructions: "",
            output_cap: 4_000,
            force_chunking: false,
            mode,
        }
        .digest()
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(key("abc", "source"), key("abc", "source"));
        assert_eq!(key("abc", "source").len(), 64);
        assert_ne!(key("abc", "source"), key("abd", "source"));
        assert_ne!(key("abc", "source"), key("abc", "topic"));
    }

    #[test]
    fn test_request_defaults() {
        let request: SummarizeRequest = serde_json::from_str(r#"{"fullText": "hello"}"#).unwrap();
        assert_eq!(request, SummarizeRequest::new("hello"));
        assert_eq!(request.language, "English");
    }

    #[test]
    fn test_strategy_from_reduce() {
        assert_eq!(SummaryStrategy::from(ReduceStrategy::TwoStage), SummaryStrategy::TwoStage);
        assert_eq!(SummaryStrategy::from(ReduceStrategy::SingleStage), SummaryStrategy::SingleStage);
    }
}
