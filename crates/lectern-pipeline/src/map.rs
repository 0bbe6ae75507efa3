//! MAP phase: per-chunk knowledge extraction
//!
//! One generation call per chunk. A chunk whose call fails or whose output
//! cannot be parsed degrades to a single fallback concept; MAP never fails
//! the whole document.

use crate::budget::chunk_budget;
use crate::config::{BudgetConfig, PipelineConfig};
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::prompt::PromptKind;
use crate::repair::parse_robust;
use futures::stream::{self, StreamExt};
use lectern_domain::{AggregatedKnowledge, Chunk, ExtractedConcept, ExtractedKnowledge, SourceRef};
use lectern_llm::LlmGateway;
use tracing::{debug, info, warn};

/// Extraction result for one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkKnowledge {
    /// Chunk index in document order
    pub index: usize,

    /// Extracted items, tagged with their source
    pub knowledge: ExtractedKnowledge,

    /// The model output could not be parsed
    pub parse_failed: bool,

    /// Generation error, when the call itself failed
    pub error: Option<String>,
}

impl ChunkKnowledge {
    /// Whether this chunk fell back to a placeholder concept
    pub fn degraded(&self) -> bool {
        self.parse_failed || self.error.is_some()
    }
}

/// Runs knowledge extraction over chunks
pub struct MapPhase {
    gateway: LlmGateway,
    budget: BudgetConfig,
    concurrency: usize,
    fallback_chars: usize,
}

impl MapPhase {
    /// Create a MAP phase from the pipeline configuration
    pub fn new(gateway: LlmGateway, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            budget: config.budget.clone(),
            concurrency: config.map_concurrency.max(1),
            fallback_chars: config.fallback_chars,
        }
    }

    /// Extract knowledge from one chunk's text as raw model output
    ///
    /// When `budget` is `None` it is sized with [`chunk_budget`].
    pub async fn summarize_chunk(&self, chunk_text: &str, ctx: &RunContext, budget: Option<u32>) -> Result<String, PipelineError> {
        let max_tokens = budget.unwrap_or_else(|| chunk_budget(chunk_text, &self.budget));
        let prompt = ctx.prompt(PromptKind::MapExtract).with_part("Document fragment", chunk_text);
        let generation = self.gateway.generate(&ctx.request(&prompt, max_tokens)).await?;
        Ok(generation.text)
    }

    /// Extract, parse and tag one chunk
    pub async fn extract_chunk(&self, index: usize, chunk: &Chunk, ctx: &RunContext) -> ChunkKnowledge {
        let source = SourceRef {
            chunk_index: index,
            heading_path: chunk.heading_path.clone(),
        };
        let label = chunk_label(index, chunk);
        let text = chunk.text();

        let (mut knowledge, parse_failed, error) = match self.summarize_chunk(&text, ctx, None).await {
            Ok(output) => match parse_knowledge(&output) {
                Ok(mut knowledge) => {
                    salvage_items(&mut knowledge, &label);
                    (knowledge, false, None)
                }
                Err(e) => {
                    warn!("Chunk {} output unparsable, using fallback: {}", index, e);
                    (self.fallback(&label, &text), true, None)
                }
            },
            Err(e) => {
                warn!("Chunk {} generation failed, using fallback: {}", index, e);
                (self.fallback(&label, &text), false, Some(e.to_string()))
            }
        };

        knowledge.tag_source(&source);
        debug!("Chunk {} ({}) yielded {} items", index, label, knowledge.item_count());

        ChunkKnowledge {
            index,
            knowledge,
            parse_failed,
            error,
        }
    }

    /// Extract every chunk, results ordered by chunk index
    ///
    /// Up to `map_concurrency` calls are in flight at once.
    pub async fn run(&self, chunks: &[Chunk], ctx: &RunContext) -> Vec<ChunkKnowledge> {
        info!("MAP over {} chunks (concurrency {})", chunks.len(), self.concurrency);
        let results: Vec<ChunkKnowledge> = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| self.extract_chunk(index, chunk, ctx))
            .buffered(self.concurrency)
            .collect()
            .await;

        let degraded = results.iter().filter(|r| r.degraded()).count();
        if degraded > 0 {
            warn!("{} of {} chunks fell back to placeholder knowledge", degraded, results.len());
        }
        results
    }

    fn fallback(&self, label: &str, raw_text: &str) -> ExtractedKnowledge {
        ExtractedKnowledge::fallback(format!("Unparsed content: {}", label), raw_text, self.fallback_chars)
    }
}

/// Concatenate chunk results in index order
pub fn aggregate(results: &[ChunkKnowledge]) -> AggregatedKnowledge {
    let mut ordered: Vec<&ChunkKnowledge> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);
    AggregatedKnowledge::from_chunks(ordered.into_iter().map(|r| r.knowledge.clone()))
}

fn chunk_label(index: usize, chunk: &Chunk) -> String {
    let label = chunk.heading_label();
    if label.trim().is_empty() {
        format!("chunk {}", index + 1)
    } else {
        label
    }
}

fn parse_knowledge(output: &str) -> Result<ExtractedKnowledge, PipelineError> {
    let value = parse_robust(output)?;
    if !value.is_object() {
        return Err(PipelineError::Json("extraction output is not an object".to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Give nameless items a visible name instead of losing them
fn salvage_items(knowledge: &mut ExtractedKnowledge, label: &str) {
    for concept in &mut knowledge.concepts {
        let has_text = [&concept.definition, &concept.explanation, &concept.example]
            .iter()
            .any(|s| !s.trim().is_empty());
        if concept.term.trim().is_empty() && has_text {
            concept.term = format!("Untitled concept ({})", label);
        }
    }

    let mut orphans = Vec::new();
    for formula in &mut knowledge.formulas {
        if formula.name.trim().is_empty() && !formula.expression.trim().is_empty() {
            formula.name = formula.expression.chars().take(60).collect();
        }
        if formula.name.trim().is_empty() && !formula.worked_example.trim().is_empty() {
            orphans.push(ExtractedConcept {
                term: format!("Untitled formula ({})", label),
                definition: formula.worked_example.clone(),
                ..Default::default()
            });
        }
    }

    for theorem in &mut knowledge.theorems {
        if theorem.name.trim().is_empty() && !theorem.statement.trim().is_empty() {
            theorem.name = format!("Untitled theorem ({})", label);
        }
    }

    let before = knowledge.item_count();
    knowledge.concepts.retain(|c| !c.term.trim().is_empty());
    knowledge.formulas.retain(|f| !f.name.trim().is_empty());
    knowledge.theorems.retain(|t| !t.name.trim().is_empty());
    knowledge
        .examples
        .retain(|e| !e.context.trim().is_empty() || !e.solution.trim().is_empty());
    let dropped = before - knowledge.item_count();
    if dropped > 0 {
        debug!("Dropped {} items without any text in {}", dropped, label);
    }
    knowledge.concepts.extend(orphans);
}
