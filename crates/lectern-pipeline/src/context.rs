//! Per-request values threaded through every stage

use crate::prompt::{PromptBuilder, PromptKind};
use lectern_domain::{DocumentDomain, RequestId};
use lectern_llm::GenerationRequest;

/// What one summarization request carries into each stage
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Output language
    pub language: String,

    /// Caller and pipeline instructions added to every prompt
    pub instructions: Vec<String>,

    /// Caller identity for the usage ledger
    pub user_id: Option<String>,

    /// Ties all generation calls of this request together
    pub request_id: RequestId,

    /// Detected document domain
    pub domain: DocumentDomain,

    /// Output token cap, already clamped to the plan
    pub output_cap: u32,

    /// Input is past the density threshold; output prompts ask for compact prose
    pub density_boost: bool,
}

impl RunContext {
    /// Create a context with a fresh request ID
    pub fn new(language: impl Into<String>, output_cap: u32) -> Self {
        Self {
            language: language.into(),
            instructions: Vec::new(),
            user_id: None,
            request_id: RequestId::new(),
            domain: DocumentDomain::General,
            output_cap,
            density_boost: false,
        }
    }

    /// Add an instruction (ignored when blank)
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.trim().is_empty() {
            self.instructions.push(instruction);
        }
        self
    }

    /// Attach caller identity
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Set the detected domain
    pub fn with_domain(mut self, domain: DocumentDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Turn on compact-style output when `estimated_tokens` exceeds `threshold`
    pub fn with_density(mut self, estimated_tokens: usize, threshold: usize) -> Self {
        self.density_boost = estimated_tokens > threshold;
        self
    }

    /// A prompt builder preloaded with this request's language and instructions
    pub fn prompt(&self, kind: PromptKind) -> PromptBuilder {
        let builder = PromptBuilder::new(kind)
            .with_language(&self.language)
            .with_domain(self.domain)
            .with_density_boost(self.density_boost);
        self.instructions
            .iter()
            .fold(builder, |builder, line| builder.with_instruction(line.clone()))
    }

    /// Turn a built prompt into a gateway request tagged with this request's identity
    pub fn request(&self, prompt: &PromptBuilder, max_tokens: u32) -> GenerationRequest {
        let (system, user) = prompt.build();
        GenerationRequest::new(prompt.kind().endpoint(), system, user, max_tokens)
            .for_user(self.user_id.clone(), Some(self.request_id))
    }
}
