//! REDUCE phase: outline, fill, validate, repair
//!
//! The two-stage flow freezes an outline before any prose is written, fills
//! it, then runs one bounded repair pass against the deterministic validator.
//! Any failure in the two-stage flow falls back to a single merge call.

use crate::budget::{distribute_merge_budget, ItemCounts};
use crate::config::{BudgetConfig, PipelineConfig, ReduceConfig};
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::prompt::{self, PromptKind};
use crate::repair::parse_robust;
use lectern_domain::{AggregatedKnowledge, FinalDocument, Outline, Section};
use lectern_gatekeeper::{format_issues, DocumentValidator, ValidationIssue};
use lectern_llm::LlmGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// States of the REDUCE state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReduceState {
    /// First outline
    OutlineDraft,
    /// Outline regenerated with more sections
    OutlineExpand,
    /// Outline regenerated with missing themes
    OutlineGapFix,
    /// Document written from the frozen outline
    Fill,
    /// Deterministic validation
    Validate,
    /// One repair pass over listed issues
    Repair,
    /// Single-stage fallback
    Merge,
    /// Finished
    Done,
}

impl fmt::Display for ReduceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReduceState::OutlineDraft => "OUTLINE_DRAFT",
            ReduceState::OutlineExpand => "OUTLINE_EXPAND",
            ReduceState::OutlineGapFix => "OUTLINE_GAP_FIX",
            ReduceState::Fill => "FILL",
            ReduceState::Validate => "VALIDATE",
            ReduceState::Repair => "REPAIR",
            ReduceState::Merge => "MERGE",
            ReduceState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Which REDUCE strategy produced the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReduceStrategy {
    /// Outline then fill
    TwoStage,
    /// Merge fallback
    SingleStage,
}

/// What happened during one REDUCE run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReduceReport {
    /// States visited, in order
    pub states: Vec<ReduceState>,

    /// Issues reported by validation
    pub issues: Vec<ValidationIssue>,

    /// The repair call succeeded and replaced the document
    pub repaired: bool,

    /// Why the two-stage flow was abandoned
    pub fallback_reason: Option<String>,

    /// The frozen outline
    pub outline: Option<Outline>,
}

impl ReduceReport {
    fn enter(&mut self, state: ReduceState) {
        match self.states.last() {
            Some(prev) => debug!("REDUCE {} -> {}", prev, state),
            None => debug!("REDUCE start -> {}", state),
        }
        self.states.push(state);
    }

    /// Whether the run passed through `state`
    pub fn visited(&self, state: ReduceState) -> bool {
        self.states.contains(&state)
    }
}

/// A finished REDUCE run
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceOutcome {
    /// Synthesized document
    pub document: FinalDocument,
    /// Strategy that produced it
    pub strategy: ReduceStrategy,
    /// State trace
    pub report: ReduceReport,
}

/// Section-count targets for the outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTargets {
    /// Fewer sections than this triggers an expand pass
    pub target_min: usize,
    /// Sections the output budget can afford
    pub budget_derived_max: usize,
    /// Upper bound requested from the model
    pub target_soft_max: usize,
}

/// Compute section targets from the theme count and output budget
pub fn section_targets(theme_count: usize, output_cap: u32, per_section_cost: u32) -> SectionTargets {
    let target_min = theme_count.min(10).max(6);
    let affordable = (output_cap as u64 * 7 / 10 / per_section_cost.max(1) as u64) as usize;
    let budget_derived_max = affordable.max(8);
    let target_soft_max = budget_derived_max.min(theme_count + 4).max(target_min + 2);
    SectionTargets {
        target_min,
        budget_derived_max,
        target_soft_max,
    }
}

/// Parse model output into a document
///
/// Accepts either a full document or a bare summary object.
pub fn parse_document(output: &str) -> Result<FinalDocument, PipelineError> {
    let value = parse_robust(output)?;
    let Value::Object(map) = value else {
        return Err(PipelineError::Json("document output is not an object".to_string()));
    };
    let value = if map.contains_key("summary") {
        Value::Object(map)
    } else {
        serde_json::json!({ "summary": Value::Object(map) })
    };
    Ok(serde_json::from_value(value)?)
}

fn parse_outline(output: &str) -> Result<Outline, PipelineError> {
    let value = parse_robust(output)?;
    let value = match value {
        Value::Object(mut map) if !map.contains_key("sections") && map.contains_key("outline") => {
            map.remove("outline").unwrap_or(Value::Null)
        }
        other => other,
    };
    let mut outline: Outline = serde_json::from_value(value)?;
    outline.retain_named_sections();
    if outline.is_empty() {
        return Err(PipelineError::EmptyOutline);
    }
    Ok(outline)
}

/// Put document sections in outline order, extra sections last
pub fn reorder_to_outline(doc: &mut FinalDocument, outline: &Outline) {
    let mut placed: Vec<(usize, Section)> = Vec::new();
    let mut extras = Vec::new();
    for section in doc.summary.sections.drain(..) {
        match outline.position_of(&section.heading) {
            Some(pos) if !placed.iter().any(|(p, _)| *p == pos) => placed.push((pos, section)),
            _ => extras.push(section),
        }
    }
    placed.sort_by_key(|(pos, _)| *pos);
    doc.summary.sections = placed.into_iter().map(|(_, s)| s).chain(extras).collect();
}

/// Synthesizes aggregated knowledge into a document
pub struct ReducePipeline {
    gateway: LlmGateway,
    validator: DocumentValidator,
    reduce: ReduceConfig,
    budget: BudgetConfig,
}

impl ReducePipeline {
    /// Create a REDUCE pipeline from the pipeline configuration
    pub fn new(gateway: LlmGateway, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            validator: DocumentValidator::new(config.validation.clone()),
            reduce: config.reduce.clone(),
            budget: config.budget.clone(),
        }
    }

    /// Run REDUCE over the aggregated knowledge
    ///
    /// Tries the two-stage flow first. A failure there, after one retry of
    /// transient errors, falls back to a single merge call.
    ///
    /// # Errors
    ///
    /// Returns an error only when the merge fallback fails too.
    pub async fn run(&self, knowledge: &AggregatedKnowledge, ctx: &RunContext) -> Result<ReduceOutcome, PipelineError> {
        let payload = knowledge.to_prompt_json(self.reduce.knowledge_char_limit);
        let mut report = ReduceReport::default();

        match self.two_stage(knowledge, &payload, ctx, &mut report).await {
            Ok(document) => {
                report.enter(ReduceState::Done);
                info!("REDUCE finished two-stage ({} states)", report.states.len());
                Ok(ReduceOutcome {
                    document,
                    strategy: ReduceStrategy::TwoStage,
                    report,
                })
            }
            Err(e) => {
                warn!("Two-stage REDUCE failed, falling back to merge: {}", e);
                report.fallback_reason = Some(e.to_string());
                report.enter(ReduceState::Merge);
                let document = self.merge(knowledge, &payload, ctx).await?;
                report.enter(ReduceState::Done);
                Ok(ReduceOutcome {
                    document,
                    strategy: ReduceStrategy::SingleStage,
                    report,
                })
            }
        }
    }

    async fn two_stage(
        &self,
        knowledge: &AggregatedKnowledge,
        payload: &str,
        ctx: &RunContext,
        report: &mut ReduceReport,
    ) -> Result<FinalDocument, PipelineError> {
        let themes = knowledge.themes();
        let targets = section_targets(themes.len(), ctx.output_cap, self.reduce.per_section_cost(ctx.domain));
        debug!("{} themes, section targets {:?}", themes.len(), targets);

        report.enter(ReduceState::OutlineDraft);
        let mut outline = self
            .with_transient_retry("outline", || self.outline(PromptKind::OutlineDraft, payload, &targets, None, None, ctx))
            .await?;

        if outline.sections.len() < targets.target_min {
            report.enter(ReduceState::OutlineExpand);
            let instruction = prompt::expand_instruction(outline.sections.len(), targets.target_min, targets.target_soft_max);
            let previous = serde_json::to_string(&outline)?;
            outline = self
                .with_transient_retry("outline expand", || {
                    self.outline(PromptKind::OutlineExpand, payload, &targets, Some(&instruction), Some(&previous), ctx)
                })
                .await?;
        }

        let missing: Vec<&String> = outline.missing_themes(&themes);
        if !missing.is_empty() {
            report.enter(ReduceState::OutlineGapFix);
            debug!("Outline misses {} themes", missing.len());
            let instruction = prompt::gap_fix_instruction(&missing);
            let previous = serde_json::to_string(&outline)?;
            outline = self
                .with_transient_retry("outline gap fix", || {
                    self.outline(PromptKind::OutlineGapFix, payload, &targets, Some(&instruction), Some(&previous), ctx)
                })
                .await?;
        }
        report.outline = Some(outline.clone());

        report.enter(ReduceState::Fill);
        let outline_json = serde_json::to_string(&outline)?;
        let mut document = self
            .with_transient_retry("fill", || self.fill(payload, &outline, &outline_json, ctx))
            .await?;
        reorder_to_outline(&mut document, &outline);

        report.enter(ReduceState::Validate);
        let issues = self.validator.validate(&document, Some(&outline), ctx.domain);
        if issues.is_empty() {
            return Ok(document);
        }
        info!("Validation found {} issues, running one repair pass", issues.len());
        report.issues = issues;

        report.enter(ReduceState::Repair);
        let issue_list = format_issues(&report.issues);
        let current = serde_json::to_string(&document)?;
        match self
            .with_transient_retry("repair", || self.repair(&issue_list, &current, &outline_json, ctx))
            .await
        {
            Ok(mut repaired) => {
                reorder_to_outline(&mut repaired, &outline);
                report.repaired = true;
                Ok(repaired)
            }
            Err(e) => {
                warn!("Repair failed, keeping filled document: {}", e);
                Ok(document)
            }
        }
    }

    async fn outline(
        &self,
        kind: PromptKind,
        payload: &str,
        targets: &SectionTargets,
        instruction: Option<&str>,
        previous: Option<&str>,
        ctx: &RunContext,
    ) -> Result<Outline, PipelineError> {
        let mut builder = ctx
            .prompt(kind)
            .with_part("Extracted knowledge", payload)
            .with_instruction(format!(
                "Plan between {} and {} sections.",
                targets.target_min, targets.target_soft_max
            ));
        if let Some(previous) = previous {
            builder = builder.with_part("Previous outline", previous);
        }
        if let Some(instruction) = instruction {
            builder = builder.with_instruction(instruction);
        }

        let generation = self
            .gateway
            .generate(&ctx.request(&builder, self.reduce.outline_max_tokens))
            .await?;
        let outline = parse_outline(&generation.text)?;
        debug!("{} produced {} sections", kind.endpoint(), outline.sections.len());
        Ok(outline)
    }

    async fn fill(&self, payload: &str, outline: &Outline, outline_json: &str, ctx: &RunContext) -> Result<FinalDocument, PipelineError> {
        let thresholds = self.validator.config().thresholds.for_domain(ctx.domain);
        let builder = ctx
            .prompt(PromptKind::Fill)
            .with_part("Outline", outline_json)
            .with_part("Extracted knowledge", payload)
            .with_instruction(format!(
                "Keep these {} sections in this order: {}.",
                outline.sections.len(),
                outline.headings().join("; ")
            ))
            .with_instruction(prompt::count_requirements(thresholds));

        let generation = self.gateway.generate(&ctx.request(&builder, ctx.output_cap)).await?;
        parse_document(&generation.text)
    }

    async fn repair(&self, issues: &str, current: &str, outline_json: &str, ctx: &RunContext) -> Result<FinalDocument, PipelineError> {
        let builder = ctx
            .prompt(PromptKind::Repair)
            .with_part("Issues to fix", issues)
            .with_part("Outline", outline_json)
            .with_part("Current document", current);

        let generation = self.gateway.generate(&ctx.request(&builder, ctx.output_cap)).await?;
        parse_document(&generation.text)
    }

    async fn merge(&self, knowledge: &AggregatedKnowledge, payload: &str, ctx: &RunContext) -> Result<FinalDocument, PipelineError> {
        let counts = ItemCounts::from_tuple(knowledge.counts());
        let budget = distribute_merge_budget(counts, ctx.output_cap, &self.budget);
        let builder = ctx
            .prompt(PromptKind::Merge)
            .with_part("Extracted knowledge", payload)
            .with_instruction(format!(
                "Spend about {} tokens per concept, {} per formula and {} per theorem.",
                budget.per_concept, budget.per_formula, budget.per_theorem
            ));

        let generation = self.gateway.generate(&ctx.request(&builder, ctx.output_cap)).await?;
        let document = parse_document(&generation.text)?;
        if document.summary.sections.is_empty() {
            return Err(PipelineError::Json("merge output has no sections".to_string()));
        }
        Ok(document)
    }

    async fn with_transient_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.reduce.transient_retries => {
                    attempt += 1;
                    warn!(
                        "{} hit a transient error, retrying ({}/{}): {}",
                        what, attempt, self.reduce.transient_retries, e
                    );
                }
                result => return result,
            }
        }
    }
}
