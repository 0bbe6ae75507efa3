//! Prompts for every generation call
//!
//! Each system prompt opens with a `Task:` line naming the call. The same name
//! is recorded as the ledger endpoint.

use lectern_domain::DocumentDomain;
use lectern_gatekeeper::CountThresholds;

/// The kinds of generation call the pipeline makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Per-chunk knowledge extraction
    MapExtract,
    /// First outline draft
    OutlineDraft,
    /// Outline regenerated with more sections
    OutlineExpand,
    /// Outline regenerated with missing themes
    OutlineGapFix,
    /// Full document written from the frozen outline
    Fill,
    /// Patch listed validation issues
    Repair,
    /// Single-stage synthesis fallback
    Merge,
    /// Whole document summarized in one call
    SinglePass,
    /// Study guide written from a topic alone
    Topic,
}

impl PromptKind {
    /// Endpoint name, also the `Task:` tag of the system prompt
    pub fn endpoint(&self) -> &'static str {
        match self {
            PromptKind::MapExtract => "map.extract",
            PromptKind::OutlineDraft => "reduce.outline",
            PromptKind::OutlineExpand => "reduce.expand",
            PromptKind::OutlineGapFix => "reduce.gapfix",
            PromptKind::Fill => "reduce.fill",
            PromptKind::Repair => "reduce.repair",
            PromptKind::Merge => "reduce.merge",
            PromptKind::SinglePass => "summary.single",
            PromptKind::Topic => "summary.topic",
        }
    }

    /// The `Task:` line that opens the system prompt
    pub fn tag(&self) -> String {
        format!("Task: {}", self.endpoint())
    }

    fn instructions(&self) -> &'static str {
        match self {
            PromptKind::MapExtract => EXTRACTION_INSTRUCTIONS,
            PromptKind::OutlineDraft | PromptKind::OutlineExpand | PromptKind::OutlineGapFix => OUTLINE_INSTRUCTIONS,
            PromptKind::Fill => FILL_INSTRUCTIONS,
            PromptKind::Repair => REPAIR_INSTRUCTIONS,
            PromptKind::Merge => MERGE_INSTRUCTIONS,
            PromptKind::SinglePass => SINGLE_PASS_INSTRUCTIONS,
            PromptKind::Topic => TOPIC_INSTRUCTIONS,
        }
    }

    /// Calls that write the final document from extracted knowledge
    fn takes_domain_guidance(&self) -> bool {
        matches!(self, PromptKind::Fill | PromptKind::Merge)
    }

    /// Calls whose output grows with the input
    fn takes_density_boost(&self) -> bool {
        matches!(self, PromptKind::Fill | PromptKind::Merge | PromptKind::SinglePass)
    }

    fn schema(&self) -> &'static str {
        match self {
            PromptKind::MapExtract => EXTRACTION_SCHEMA,
            PromptKind::OutlineDraft | PromptKind::OutlineExpand | PromptKind::OutlineGapFix => OUTLINE_SCHEMA,
            _ => DOCUMENT_SCHEMA,
        }
    }
}

/// Builds the system and user prompt for one call
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    kind: PromptKind,
    language: String,
    instructions: Vec<String>,
    parts: Vec<(String, String)>,
    domain: Option<DocumentDomain>,
    density_boost: bool,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            language: "English".to_string(),
            instructions: Vec::new(),
            parts: Vec::new(),
            domain: None,
            density_boost: false,
        }
    }

    /// Language the output prose must be written in
    pub fn with_language(mut self, language: &str) -> Self {
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }

    /// Add an instruction line (ignored when blank)
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.trim().is_empty() {
            self.instructions.push(instruction.trim().to_string());
        }
        self
    }

    /// Document domain, adding a style line to fill and merge prompts
    pub fn with_domain(mut self, domain: DocumentDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Ask for compact output on calls whose size follows the input
    pub fn with_density_boost(mut self, enabled: bool) -> Self {
        self.density_boost = enabled;
        self
    }

    /// Attach a labelled block of material
    pub fn with_part(mut self, label: impl Into<String>, body: impl Into<String>) -> Self {
        self.parts.push((label.into(), body.into()));
        self
    }

    /// Kind of call being built
    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Build the system prompt
    pub fn system(&self) -> String {
        format!(
            "{}\n\n{}\n\nJSON schema:\n{}\n\n{}",
            self.kind.tag(),
            self.kind.instructions(),
            self.kind.schema(),
            COMMON_RULES
        )
    }

    /// Build the user prompt
    pub fn user(&self) -> String {
        let mut prompt = String::new();

        for (label, body) in &self.parts {
            prompt.push_str(&format!("{}:\n---\n{}\n---\n\n", label, body));
        }

        let guidance = self.guidance();
        if !self.instructions.is_empty() || !guidance.is_empty() {
            prompt.push_str("Additional instructions:\n");
            for line in self.instructions.iter().map(String::as_str).chain(guidance) {
                prompt.push_str(&format!("- {}\n", line));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("Write all prose in {}.\n\n", self.language));
        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }

    fn guidance(&self) -> Vec<&str> {
        let mut lines = Vec::new();
        if let Some(domain) = self.domain.filter(|_| self.kind.takes_domain_guidance()) {
            lines.push(domain_guidance(domain));
        }
        if self.density_boost && self.kind.takes_density_boost() {
            lines.push(DENSITY_BOOST);
        }
        lines
    }

    /// Build `(system, user)`
    pub fn build(&self) -> (String, String) {
        (self.system(), self.user())
    }
}

/// One style line per document domain
pub fn domain_guidance(domain: DocumentDomain) -> &'static str {
    match domain {
        DocumentDomain::Technical => {
            "Technical material: favour formulas with numeric worked examples, pseudocode and step-by-step derivations."
        }
        DocumentDomain::Social => {
            "Social material: favour anchored examples with dates, names, places and cases over abstract summaries."
        }
        DocumentDomain::Procedural => {
            "Procedural material: favour numbered steps, preconditions and the common mistakes at each step."
        }
        DocumentDomain::General => "Mixed material: pair every concept with one concrete example from the source.",
    }
}

/// Element counts the document must contain, phrased for a prompt
pub fn count_requirements(thresholds: &CountThresholds) -> String {
    format!(
        "Include {} diagrams, {} pseudocode blocks and {} practice problems.",
        thresholds.diagrams, thresholds.pseudocode, thresholds.practice_problems
    )
}

/// Instruction asking for more outline sections
pub fn expand_instruction(found: usize, target_min: usize, target_soft_max: usize) -> String {
    format!(
        "The previous outline had only {} sections. Expand it to between {} and {} sections, splitting broad sections and adding missing material.",
        found, target_min, target_soft_max
    )
}

/// Instruction listing themes the outline must cover
pub fn gap_fix_instruction(missing: &[&String]) -> String {
    let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
    format!(
        "The outline must add a section for each of these source themes: {}.",
        names.join("; ")
    )
}

/// Instruction injecting missing topics after a coverage shortfall
pub fn coverage_hint_instruction(topics: &[String]) -> String {
    format!(
        "The previous attempt missed these source topics; cover each of them explicitly: {}.",
        topics.join("; ")
    )
}

const DENSITY_BOOST: &str = "The source is long: write compactly. Use short sentences and bullet key points, \
merge overlapping concepts, and keep every formula and example but drop narrative filler.";

const COMMON_RULES: &str = r#"Rules:
- Be concrete and specific: prefer real numbers, named cases, dates and worked computations over generic statements
- Never output empty placeholder arrays or empty strings; omit a field instead
- Never invent content that the material does not support"#;

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract the study-relevant knowledge from one fragment of a larger document.
Return concepts with definitions, formulas with their variables and a numeric worked example,
theorems with a proof sketch and an application, and worked examples with their solution.
Only include categories that actually occur in the fragment."#;

const EXTRACTION_SCHEMA: &str = r#"{
  "concepts": [{"term": "...", "definition": "...", "explanation": "...", "example": "..."}],
  "formulas": [{"name": "...", "expression": "...", "variables": {"symbol": "meaning"}, "workedExample": "..."}],
  "theorems": [{"name": "...", "statement": "...", "proofSketch": "...", "application": "..."}],
  "examples": [{"context": "...", "solution": "...", "keyInsight": "..."}]
}"#;

const OUTLINE_INSTRUCTIONS: &str = r#"Plan the structure of a study guide from the extracted knowledge.
Produce topology only: section headings in teaching order, the concept names in each section,
the expected example kind for every concept ("numeric" for quantitative concepts, "anchored" for
concepts best illustrated by dates, names or cases), the formulas to put on the formula sheet,
and how many glossary entries to write. Do not write any prose."#;

const OUTLINE_SCHEMA: &str = r#"{
  "title": "...",
  "sections": [{"heading": "...", "concepts": [{"term": "...", "expectedExampleKind": "numeric|anchored"}]}],
  "formulaPlan": ["..."],
  "glossaryTarget": 10
}"#;

const FILL_INSTRUCTIONS: &str = r#"Write the full study guide following the outline exactly.
Keep every outline section, in outline order, with the headings unchanged.
Every concept gets at least one example of its declared kind: numeric examples use real numbers and
show the computation; anchored examples cite dates, names or cases.
Every formula gets its expression, its variables and at least one numeric worked example.
Every section and every formula carries a citation to the source heading it came from."#;

const REPAIR_INSTRUCTIONS: &str = r#"Repair the study guide below.
Fix only the listed issues. Preserve all existing correct content, section order and headings.
Return the complete corrected document."#;

const MERGE_INSTRUCTIONS: &str = r#"Write a complete study guide from the extracted knowledge in a single pass.
Organize it into sections that follow the material, give every concept a concrete example or key points,
and give every formula a numeric worked example."#;

const SINGLE_PASS_INSTRUCTIONS: &str = r#"Write a complete study guide for the document below.
Organize it into sections that follow the document, give every concept a concrete example or key points,
give every formula a numeric worked example, and cite the source heading of each section."#;

const TOPIC_INSTRUCTIONS: &str = r#"Write a complete study guide on the given topic from general knowledge.
Organize it into sections, give every concept a concrete example or key points, and give every formula
a numeric worked example. Leave citations out: there is no source document."#;

const DOCUMENT_SCHEMA: &str = r#"{
  "summary": {
    "title": "...",
    "overview": "...",
    "learningObjectives": ["..."],
    "sections": [{
      "heading": "...",
      "summary": "...",
      "concepts": [{"term": "...", "definition": "...", "explanation": "...", "example": "...", "keyPoints": ["..."], "exampleKind": "numeric|anchored"}],
      "citations": [{"sourceRef": "...", "sectionOrHeading": "...", "pageRange": "...", "evidence": "..."}]
    }],
    "formulaSheet": [{"name": "...", "expression": "...", "variables": [{"symbol": "...", "meaning": "..."}], "workedExample": "...", "citation": {"sourceRef": "...", "sectionOrHeading": "..."}}],
    "diagrams": [{"title": "...", "kind": "flowchart|graph|table", "content": "..."}],
    "pseudocode": [{"title": "...", "code": "..."}],
    "practiceProblems": [{"question": "...", "solution": "...", "difficulty": "easy|medium|hard"}],
    "glossary": [{"term": "...", "definition": "..."}]
  },
  "citations": [{"sourceRef": "...", "sectionOrHeading": "...", "evidence": "..."}]
}"#;

const OUTPUT_FORMAT_REMINDER: &str = "Remember: Return ONLY valid JSON, no markdown code blocks, no explanations.";

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_gatekeeper::DomainThresholds;

    #[test]
    fn test_system_prompt_starts_with_tag() {
        let builder = PromptBuilder::new(PromptKind::Fill);
        assert!(builder.system().starts_with("Task: reduce.fill"));
        assert!(builder.system().contains("formulaSheet"));
    }

    #[test]
    fn test_endpoints_are_distinct() {
        let kinds = [
            PromptKind::MapExtract,
            PromptKind::OutlineDraft,
            PromptKind::OutlineExpand,
            PromptKind::OutlineGapFix,
            PromptKind::Fill,
            PromptKind::Repair,
            PromptKind::Merge,
            PromptKind::SinglePass,
            PromptKind::Topic,
        ];
        let mut endpoints: Vec<&str> = kinds.iter().map(PromptKind::endpoint).collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), kinds.len());
    }

    #[test]
    fn test_user_prompt_includes_parts_and_language() {
        let (_, user) = PromptBuilder::new(PromptKind::MapExtract)
            .with_language("German")
            .with_part("Fragment", "Ohm's law relates voltage and current.")
            .build();
        assert!(user.contains("Fragment:\n---\nOhm's law"));
        assert!(user.contains("Write all prose in German."));
        assert!(!user.contains("Additional instructions"));
    }

    #[test]
    fn test_blank_instructions_are_skipped() {
        let user = PromptBuilder::new(PromptKind::Merge)
            .with_instruction("   ")
            .with_instruction("Focus on exam topics")
            .user();
        assert!(user.contains("Additional instructions:\n- Focus on exam topics\n"));
    }

    #[test]
    fn test_blank_language_keeps_default() {
        let user = PromptBuilder::new(PromptKind::Topic).with_language("").user();
        assert!(user.contains("Write all prose in English."));
    }

    #[test]
    fn test_domain_line_only_on_fill_and_merge() {
        for kind in [PromptKind::Fill, PromptKind::Merge] {
            let user = PromptBuilder::new(kind).with_domain(DocumentDomain::Technical).user();
            assert!(user.contains("- Technical material: favour formulas"));
        }
        let social = PromptBuilder::new(PromptKind::Fill).with_domain(DocumentDomain::Social).user();
        assert!(social.contains("anchored examples with dates"));
        for kind in [PromptKind::MapExtract, PromptKind::OutlineDraft, PromptKind::SinglePass] {
            let user = PromptBuilder::new(kind).with_domain(DocumentDomain::Technical).user();
            assert!(!user.contains("Additional instructions"));
        }
    }

    #[test]
    fn test_density_boost_follows_output_calls() {
        for kind in [PromptKind::Fill, PromptKind::Merge, PromptKind::SinglePass] {
            assert!(PromptBuilder::new(kind).with_density_boost(true).user().contains(DENSITY_BOOST));
            assert!(!PromptBuilder::new(kind).with_density_boost(false).user().contains(DENSITY_BOOST));
        }
        let outline = PromptBuilder::new(PromptKind::OutlineDraft).with_density_boost(true).user();
        assert!(!outline.contains(DENSITY_BOOST));
    }

    #[test]
    fn test_count_requirements_from_thresholds() {
        let thresholds = DomainThresholds::default();
        let text = count_requirements(&thresholds.technical);
        assert_eq!(text, "Include 2-4 diagrams, 2-3 pseudocode blocks and 3-5 practice problems.");
    }

    #[test]
    fn test_gap_fix_lists_themes() {
        let themes = vec!["Optics".to_string(), "Waves".to_string()];
        let refs: Vec<&String> = themes.iter().collect();
        assert!(gap_fix_instruction(&refs).contains("Optics; Waves"));
    }
}
