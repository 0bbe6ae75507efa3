//! Lectern Domain Layer
//!
//! This crate contains the data model shared by every stage of the study-guide
//! pipeline, plus the trait interfaces for the collaborators the pipeline
//! consumes but does not own (usage ledger, response cache).
//!
//! ## Key Concepts
//!
//! - **ContentBlock / Chunk**: Structural fragments of the source document
//! - **ExtractedKnowledge**: Per-chunk MAP output (concepts, formulas, theorems, examples)
//! - **Outline**: Topology-only plan that freezes section order before content is written
//! - **FinalDocument**: The delivered study guide, with citations and coverage
//! - **PlanLimits**: Per-plan input/output caps injected into the pipeline
//!
//! ## Architecture
//!
//! - Pure data and pure functions only, no I/O
//! - Serde structs at every stage boundary instead of untyped JSON maps
//! - Infrastructure implementations of the traits live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod document;
pub mod kind;
pub mod knowledge;
pub mod lenient;
pub mod outline;
pub mod plan;
pub mod traits;
pub mod usage;

// Re-exports for convenience
pub use block::{BlockKind, Chunk, ContentBlock};
pub use document::{
    Citation, ConceptEntry, Coverage, Diagram, FinalDocument, FormulaEntry, GlossaryEntry,
    PracticeProblem, PseudocodeBlock, Section, StudySummary, Variable,
};
pub use kind::{ConceptDomain, DocumentDomain, ExampleKind};
pub use knowledge::{
    AggregatedKnowledge, ExtractedConcept, ExtractedExample, ExtractedFormula, ExtractedKnowledge,
    ExtractedTheorem, SourceRef,
};
pub use outline::{Outline, OutlineConcept, OutlineSection};
pub use plan::PlanLimits;
pub use traits::{CollaboratorError, ResponseCache, UsageLedger};
pub use usage::{RequestId, UsageRecord};
