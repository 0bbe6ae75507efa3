//! Lectern Pipeline
//!
//! Turns a document into a structured study guide with a map-reduce flow over
//! an LLM backend.
//!
//! # Overview
//!
//! Small inputs are summarized in one call. Larger inputs are parsed into a
//! heading hierarchy, chunked, and sent through MAP (per-chunk knowledge
//! extraction) and REDUCE (outline, fill, validate, repair). Coverage of the
//! source topics is measured afterwards and may trigger one regeneration.
//!
//! # Architecture
//!
//! ```text
//! text → StructureParser → TextChunker → MapPhase → ReducePipeline
//!      → CoverageValidator → QualityEnforcer → cache → SummaryResponse
//! ```
//!
//! # Example Usage
//!
//! ```
//! use lectern_llm::{LlmGateway, MockBackend};
//! use lectern_pipeline::{PipelineConfig, SummarizeRequest, Summarizer, SummaryStrategy};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MockBackend::new(
//!     r#"{"summary": {"title": "Photosynthesis", "sections": [{"heading": "Light reactions"}]}}"#,
//! );
//! let summarizer = Summarizer::new(LlmGateway::new(Arc::new(backend)), PipelineConfig::default())?;
//!
//! let response = summarizer
//!     .summarize(SummarizeRequest::new("Plants turn light into chemical energy."))
//!     .await;
//!
//! assert_eq!(response.strategy, SummaryStrategy::SinglePass);
//! assert_eq!(response.document.summary.title, "Photosynthesis");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod budget;
mod chunking;
mod config;
mod context;
mod error;
mod map;
pub mod prompt;
mod reduce;
pub mod repair;
pub mod structure;
mod summarizer;

#[cfg(test)]
mod tests;

pub use lectern_gatekeeper::classify;

pub use budget::{distribute_merge_budget, ItemCounts, MergeBudget};
pub use chunking::TextChunker;
pub use config::{BudgetConfig, ChunkConfig, PipelineConfig, ReduceConfig};
pub use context::RunContext;
pub use error::PipelineError;
pub use map::{aggregate, ChunkKnowledge, MapPhase};
pub use prompt::{PromptBuilder, PromptKind};
pub use reduce::{
    parse_document, reorder_to_outline, section_targets, ReduceOutcome, ReducePipeline, ReduceReport, ReduceState,
    ReduceStrategy, SectionTargets,
};
pub use repair::parse_robust;
pub use summarizer::{CacheKey, SummarizeRequest, Summarizer, SummaryResponse, SummaryStrategy};
