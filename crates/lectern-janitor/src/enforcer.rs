//! Deterministic cleanup of finished study guides
//!
//! The enforcer makes no model calls and never fails. Running it twice
//! produces the same document as running it once.

use crate::{CleanupMetrics, EnforcerConfig, JanitorError};
use lectern_domain::{Citation, ConceptDomain, ConceptEntry, FinalDocument, FormulaEntry, StudySummary};
use lectern_gatekeeper::classify::{detect_concept_domain, has_anchored_signal, has_numeric_signal};
use lectern_gatekeeper::coverage::similarity;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

static CONTROL_FLOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:if|else|for|while|return|repeat|until)\b").expect("hardcoded regex pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

static TERM_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(\s|$)").expect("hardcoded regex pattern is valid"));

/// Split text into sentences, keeping terminal punctuation
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or end of input,
/// so decimals like `3.5` stay intact.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = idx + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn retain_counted<T>(items: &mut Vec<T>, metrics: &mut CleanupMetrics, keep: impl FnMut(&T) -> bool) {
    let before = items.len();
    items.retain(keep);
    metrics.empty_entries_dropped += before - items.len();
}

fn clean_string_list(items: &mut Vec<String>, metrics: &mut CleanupMetrics) {
    items.iter_mut().for_each(trim_in_place);
    retain_counted(items, metrics, |s| !s.is_empty());
}

fn has_words(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn trim_citation(citation: &mut Citation) {
    trim_in_place(&mut citation.source_ref);
    trim_in_place(&mut citation.section_or_heading);
    trim_in_place(&mut citation.page_range);
    trim_in_place(&mut citation.evidence);
}

/// Applies the cleanup steps to a finished document
///
/// # Examples
///
/// ```
/// use lectern_domain::FinalDocument;
/// use lectern_janitor::QualityEnforcer;
///
/// let enforcer = QualityEnforcer::default();
/// let (doc, metrics) = enforcer.enforce(FinalDocument::failure("backend offline"));
/// assert!(doc.is_failure());
/// assert!(metrics.is_clean());
/// ```
#[derive(Debug, Clone)]
pub struct QualityEnforcer {
    config: EnforcerConfig,
    filler: Option<Regex>,
}

impl Default for QualityEnforcer {
    fn default() -> Self {
        let config = EnforcerConfig::default();
        let filler = filler_regex(&config.filler_phrases).ok().flatten();
        Self { config, filler }
    }
}

fn filler_regex(phrases: &[String]) -> Result<Option<Regex>, regex::Error> {
    if phrases.is_empty() {
        return Ok(None);
    }
    let mut sorted: Vec<&String> = phrases.iter().collect();
    sorted.sort_by_key(|p| std::cmp::Reverse(p.len()));
    let alternation = sorted
        .iter()
        .map(|p| {
            p.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:{})[,:]?\s*", alternation)).map(Some)
}

impl QualityEnforcer {
    /// Create an enforcer, validating the configuration
    pub fn new(config: EnforcerConfig) -> Result<Self, JanitorError> {
        config.validate()?;
        let filler = filler_regex(&config.filler_phrases).map_err(|e| JanitorError::Config(e.to_string()))?;
        Ok(Self { config, filler })
    }

    /// Active configuration
    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Clean a document
    ///
    /// Steps run in a fixed order: trim and drop empties, sanitize examples,
    /// inject missing examples, split formulas, drop near-duplicate sentences,
    /// dedup concepts and glossary, normalize citations, clamp coverage.
    pub fn enforce(&self, mut doc: FinalDocument) -> (FinalDocument, CleanupMetrics) {
        let mut metrics = CleanupMetrics::new();

        self.trim_and_drop_empty(&mut doc, &mut metrics);
        self.sanitize_examples(&mut doc.summary, &mut metrics);
        self.inject_examples(&mut doc.summary, &mut metrics);
        self.split_formulas(&mut doc.summary, &mut metrics);
        self.dedup_sentences(&mut doc.summary, &mut metrics);
        self.dedup_entries(&mut doc.summary, &mut metrics);
        self.normalize_citations(&mut doc, &mut metrics);
        self.clamp_coverage(&mut doc, &mut metrics);

        debug!("Enforcer made {} changes", metrics.total());
        (doc, metrics)
    }

    /// Serialize a document, pruning null, empty strings, empty lists and empty objects
    pub fn render(&self, doc: &FinalDocument) -> Value {
        match serde_json::to_value(doc) {
            Ok(value) => prune(value).unwrap_or_else(|| Value::Object(Map::new())),
            Err(e) => {
                warn!("Failed to serialize document: {}", e);
                Value::Object(Map::new())
            }
        }
    }

    fn trim_and_drop_empty(&self, doc: &mut FinalDocument, metrics: &mut CleanupMetrics) {
        let summary = &mut doc.summary;
        trim_in_place(&mut summary.title);
        trim_in_place(&mut summary.overview);
        clean_string_list(&mut summary.learning_objectives, metrics);

        for section in &mut summary.sections {
            trim_in_place(&mut section.heading);
            trim_in_place(&mut section.summary);
            for concept in &mut section.concepts {
                trim_in_place(&mut concept.term);
                trim_in_place(&mut concept.definition);
                trim_in_place(&mut concept.explanation);
                trim_in_place(&mut concept.example);
                clean_string_list(&mut concept.key_points, metrics);
            }
            retain_counted(&mut section.concepts, metrics, |c| {
                !(c.term.is_empty()
                    && c.definition.is_empty()
                    && c.explanation.is_empty()
                    && c.example.is_empty()
                    && c.key_points.is_empty())
            });
            section.citations.iter_mut().for_each(trim_citation);
        }
        retain_counted(&mut summary.sections, metrics, |s| {
            !(s.heading.is_empty() && s.summary.is_empty() && s.concepts.is_empty())
        });

        for formula in &mut summary.formula_sheet {
            trim_in_place(&mut formula.name);
            trim_in_place(&mut formula.expression);
            trim_in_place(&mut formula.worked_example);
            trim_in_place(&mut formula.pseudocode);
            for variable in &mut formula.variables {
                trim_in_place(&mut variable.symbol);
                trim_in_place(&mut variable.meaning);
            }
            retain_counted(&mut formula.variables, metrics, |v| !v.symbol.is_empty());
            if let Some(citation) = formula.citation.as_mut() {
                trim_citation(citation);
            }
        }
        retain_counted(&mut summary.formula_sheet, metrics, |f| {
            !(f.name.is_empty() && f.expression.is_empty() && f.pseudocode.is_empty())
        });

        for diagram in &mut summary.diagrams {
            trim_in_place(&mut diagram.title);
            trim_in_place(&mut diagram.kind);
            trim_in_place(&mut diagram.content);
        }
        retain_counted(&mut summary.diagrams, metrics, |d| !d.content.is_empty() || !d.title.is_empty());

        for block in &mut summary.pseudocode {
            trim_in_place(&mut block.title);
            // Indentation is meaningful; only strip trailing whitespace and blank edges.
            let code = block.code.trim_end().trim_start_matches(['\n', '\r']);
            if code.len() != block.code.len() {
                block.code = code.to_string();
            }
        }
        retain_counted(&mut summary.pseudocode, metrics, |b| !b.code.trim().is_empty());

        for problem in &mut summary.practice_problems {
            trim_in_place(&mut problem.question);
            trim_in_place(&mut problem.solution);
            trim_in_place(&mut problem.difficulty);
        }
        retain_counted(&mut summary.practice_problems, metrics, |p| !p.question.is_empty());

        for entry in &mut summary.glossary {
            trim_in_place(&mut entry.term);
            trim_in_place(&mut entry.definition);
        }
        retain_counted(&mut summary.glossary, metrics, |g| !g.term.is_empty());

        doc.citations.iter_mut().for_each(trim_citation);
        if let Some(coverage) = doc.coverage.as_mut() {
            clean_string_list(&mut coverage.missing_topics, metrics);
        }
    }

    fn sanitize_example(&self, example: &str, metrics: &mut CleanupMetrics) -> Option<String> {
        let mut text = example.to_string();
        let mut stripped = false;

        if let Some(filler) = &self.filler {
            while let Some(range) = filler.find(&text).map(|m| m.range()) {
                text.replace_range(range, "");
                metrics.filler_phrases_removed += 1;
                stripped = true;
            }
        }
        if stripped {
            let collapsed = WHITESPACE.replace_all(text.trim(), " ").into_owned();
            text = if has_words(&collapsed) {
                capitalize_first(&collapsed)
            } else {
                String::new()
            };
        }

        let parts = sentences(&text);
        if parts.len() > self.config.max_example_sentences {
            text = parts[..self.config.max_example_sentences].join(" ");
            metrics.examples_capped += 1;
            stripped = true;
        }

        stripped.then_some(text)
    }

    fn sanitize_examples(&self, summary: &mut StudySummary, metrics: &mut CleanupMetrics) {
        for concept in summary.sections.iter_mut().flat_map(|s| s.concepts.iter_mut()) {
            if concept.example.is_empty() {
                continue;
            }
            if let Some(cleaned) = self.sanitize_example(&concept.example, metrics) {
                concept.example = cleaned;
            }
        }
    }

    fn inject_examples(&self, summary: &mut StudySummary, metrics: &mut CleanupMetrics) {
        for concept in summary.sections.iter_mut().flat_map(|s| s.concepts.iter_mut()) {
            if !concept.example.is_empty() || !concept.key_points.is_empty() {
                continue;
            }
            let home = concept.home_text();
            if has_numeric_signal(&home) || has_anchored_signal(&home) {
                let derived = self.derive_key_points(concept);
                if !derived.is_empty() {
                    concept.key_points = derived;
                    metrics.key_points_derived += 1;
                }
            } else {
                concept.example = self.injected_example(concept);
                metrics.examples_injected += 1;
            }
        }
    }

    /// Template example already in the form `sanitize_example` leaves alone
    fn injected_example(&self, concept: &ConceptEntry) -> String {
        let term = self.template_term(&concept.term);
        let signal = format!("{} {}", concept.term, concept.home_text());
        let example = template_example(&term, detect_concept_domain(&signal));
        let mut scratch = CleanupMetrics::new();
        self.sanitize_example(&example, &mut scratch).unwrap_or(example)
    }

    /// The term as a single clause: no filler, no sentence breaks
    fn template_term(&self, term: &str) -> String {
        let mut text = term.to_string();
        if let Some(filler) = &self.filler {
            while let Some(range) = filler.find(&text).map(|m| m.range()) {
                text.replace_range(range, "");
            }
        }
        let unbroken = TERM_BREAK.replace_all(&text, "$1");
        let collapsed = WHITESPACE.replace_all(unbroken.trim(), " ").into_owned();
        if has_words(&collapsed) {
            collapsed
        } else {
            "this concept".to_string()
        }
    }

    fn derive_key_points(&self, concept: &ConceptEntry) -> Vec<String> {
        let source = if concept.definition.is_empty() {
            &concept.explanation
        } else {
            &concept.definition
        };
        sentences(source)
            .into_iter()
            .take(self.config.max_derived_key_points)
            .map(str::to_string)
            .collect()
    }

    fn split_formulas(&self, summary: &mut StudySummary, metrics: &mut CleanupMetrics) {
        for formula in &mut summary.formula_sheet {
            if split_control_flow(formula) {
                metrics.formulas_split += 1;
            }
        }
    }

    fn dedup_text(&self, text: &mut String, metrics: &mut CleanupMetrics) {
        let mut kept: Vec<&str> = Vec::new();
        let mut removed = 0;
        for sentence in sentences(text) {
            let duplicate = kept
                .iter()
                .any(|k| similarity(k, sentence) >= self.config.near_duplicate_threshold);
            if duplicate {
                removed += 1;
            } else {
                kept.push(sentence);
            }
        }
        if removed > 0 {
            *text = kept.join(" ");
            metrics.duplicate_sentences_removed += removed;
        }
    }

    fn dedup_sentences(&self, summary: &mut StudySummary, metrics: &mut CleanupMetrics) {
        self.dedup_text(&mut summary.overview, metrics);
        for section in &mut summary.sections {
            self.dedup_text(&mut section.summary, metrics);
            for concept in &mut section.concepts {
                self.dedup_text(&mut concept.explanation, metrics);
            }
        }
    }

    fn dedup_entries(&self, summary: &mut StudySummary, metrics: &mut CleanupMetrics) {
        for section in &mut summary.sections {
            let mut seen = HashSet::new();
            let before = section.concepts.len();
            section
                .concepts
                .retain(|c| c.term.is_empty() || seen.insert(c.term.to_lowercase()));
            metrics.duplicate_concepts_removed += before - section.concepts.len();
        }

        let mut seen = HashSet::new();
        let before = summary.glossary.len();
        summary.glossary.retain(|g| seen.insert(g.term.to_lowercase()));
        metrics.duplicate_glossary_removed += before - summary.glossary.len();
    }

    fn normalize_list(&self, citations: &mut Vec<Citation>, metrics: &mut CleanupMetrics) {
        for citation in citations.iter_mut() {
            self.cap_evidence(citation, metrics);
        }
        let mut seen = HashSet::new();
        let before = citations.len();
        citations.retain(|c| !c.is_empty() && seen.insert(c.clone()));
        metrics.citations_dropped += before - citations.len();
    }

    fn cap_evidence(&self, citation: &mut Citation, metrics: &mut CleanupMetrics) {
        if citation.evidence.chars().count() > self.config.max_evidence_chars {
            citation.evidence = truncate_chars(&citation.evidence, self.config.max_evidence_chars)
                .trim_end()
                .to_string();
            metrics.evidence_truncated += 1;
        }
    }

    fn normalize_citations(&self, doc: &mut FinalDocument, metrics: &mut CleanupMetrics) {
        self.normalize_list(&mut doc.citations, metrics);
        for section in &mut doc.summary.sections {
            self.normalize_list(&mut section.citations, metrics);
        }
        for formula in &mut doc.summary.formula_sheet {
            if let Some(citation) = formula.citation.as_mut() {
                self.cap_evidence(citation, metrics);
            }
            if formula.citation.as_ref().is_some_and(Citation::is_empty) {
                formula.citation = None;
                metrics.citations_dropped += 1;
            }
        }
    }

    fn clamp_coverage(&self, doc: &mut FinalDocument, metrics: &mut CleanupMetrics) {
        let Some(coverage) = doc.coverage.as_mut() else {
            return;
        };
        let clamped = if coverage.score.is_nan() {
            0.0
        } else {
            coverage.score.clamp(0.0, 1.0)
        };
        if clamped != coverage.score {
            coverage.score = clamped;
            metrics.coverage_clamped += 1;
        }
        if coverage.missing_topics.len() > self.config.max_missing_topics {
            coverage.missing_topics.truncate(self.config.max_missing_topics);
            metrics.coverage_clamped += 1;
        }
    }
}

fn template_example(term: &str, domain: ConceptDomain) -> String {
    match domain {
        ConceptDomain::Quant => format!(
            "For instance, applying {} to an input of 10 and comparing it with an input of 20 shows how the result scales.",
            term
        ),
        ConceptDomain::Qual => format!(
            "For instance, {} can be traced through one specific, documented case from the source material.",
            term
        ),
        ConceptDomain::Semi => format!(
            "For instance, {} applies in one concrete situation where each condition of its definition holds.",
            term
        ),
    }
}

/// Move control-flow segments of a formula expression into its pseudocode
///
/// Returns whether anything moved.
fn split_control_flow(formula: &mut FormulaEntry) -> bool {
    if !CONTROL_FLOW.is_match(&formula.expression) {
        return false;
    }
    let (control, math): (Vec<&str>, Vec<&str>) = formula
        .expression
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .partition(|s| CONTROL_FLOW.is_match(s));

    let moved = control.join("\n");
    formula.pseudocode = if formula.pseudocode.is_empty() {
        moved
    } else {
        format!("{}\n{}", formula.pseudocode, moved)
    };
    formula.expression = math.join("; ");
    true
}

/// Recursively drop null, `""`, `[]` and `{}`; `None` when the value itself is empty
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(prune).collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_domain::{Coverage, GlossaryEntry, Section};
    use proptest::prelude::*;
    use serde_json::json;

    fn section_with(concepts: Vec<ConceptEntry>) -> Section {
        Section {
            heading: "Kinematics".to_string(),
            concepts,
            ..Default::default()
        }
    }

    fn doc_with(sections: Vec<Section>) -> FinalDocument {
        FinalDocument {
            summary: StudySummary {
                title: "Physics".to_string(),
                sections,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn concept(term: &str, definition: &str, example: &str) -> ConceptEntry {
        ConceptEntry {
            term: term.to_string(),
            definition: definition.to_string(),
            example: example.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sentences_respect_decimals() {
        assert_eq!(
            sentences("Speed is 3.5 m/s. It doubles! Why? Because"),
            vec!["Speed is 3.5 m/s.", "It doubles!", "Why?", "Because"]
        );
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn test_trims_and_drops_empty_entries() {
        let mut doc = doc_with(vec![
            section_with(vec![
                concept("  Velocity ", "Rate of change of position. ", "5 m/s"),
                ConceptEntry::default(),
            ]),
            Section::default(),
        ]);
        doc.summary.learning_objectives = vec!["  ".to_string(), "Compute speed".to_string()];

        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.summary.sections.len(), 1);
        assert_eq!(doc.summary.sections[0].concepts.len(), 1);
        assert_eq!(doc.summary.sections[0].concepts[0].term, "Velocity");
        assert_eq!(doc.summary.learning_objectives, vec!["Compute speed"]);
        assert_eq!(metrics.empty_entries_dropped, 3);
    }

    #[test]
    fn test_filler_stripped_and_capped() {
        let doc = doc_with(vec![section_with(vec![concept(
            "Velocity",
            "Rate of change of position.",
            "Imagine a scenario where a car covers 100 m in 20 s. Its speed is 5 m/s. That is brisk. Very brisk.",
        )])]);
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(
            doc.summary.sections[0].concepts[0].example,
            "A car covers 100 m in 20 s. Its speed is 5 m/s."
        );
        assert_eq!(metrics.filler_phrases_removed, 1);
        assert_eq!(metrics.examples_capped, 1);
    }

    #[test]
    fn test_pure_filler_example_replaced_by_template() {
        let doc = doc_with(vec![section_with(vec![concept("Inertia", "Resistance to change.", "Imagine a scenario.")])]);
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        let example = &doc.summary.sections[0].concepts[0].example;
        assert!(example.starts_with("For instance, Inertia"), "got {}", example);
        assert_eq!(metrics.examples_injected, 1);
    }

    #[test]
    fn test_injection_never_overwrites() {
        let doc = doc_with(vec![section_with(vec![concept("Velocity", "Speed with direction.", "A car at 5 m/s north.")])]);
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.summary.sections[0].concepts[0].example, "A car at 5 m/s north.");
        assert_eq!(metrics.examples_injected, 0);
    }

    #[test]
    fn test_signal_in_definition_derives_key_points() {
        let doc = doc_with(vec![section_with(vec![concept(
            "Treaty of Westphalia",
            "Signed in 1648. It ended the Thirty Years War.",
            "",
        )])]);
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        let concept = &doc.summary.sections[0].concepts[0];
        assert!(concept.example.is_empty());
        assert_eq!(concept.key_points, vec!["Signed in 1648.", "It ended the Thirty Years War."]);
        assert_eq!(metrics.key_points_derived, 1);
    }

    #[test]
    fn test_template_follows_concept_domain() {
        let enforcer = QualityEnforcer::default();
        let quant = enforcer.injected_example(&concept("Average rate", "The ratio of change in output to input.", ""));
        assert!(quant.contains("input of 10"));
        let semi = enforcer.injected_example(&concept("Habit", "A routine behaviour.", ""));
        assert!(semi.contains("concrete situation"));
    }

    #[test]
    fn test_template_term_has_no_breaks_or_filler() {
        let enforcer = QualityEnforcer::default();
        assert_eq!(enforcer.template_term("J. R. R. Tolkien style"), "J R R Tolkien style");
        assert_eq!(enforcer.template_term("Picture this reasoning"), "reasoning");
        assert_eq!(enforcer.template_term("Ratio 3.5 etc."), "Ratio 3.5 etc");
        assert_eq!(enforcer.template_term("imagine that"), "this concept");
    }

    #[test]
    fn test_injected_example_survives_second_pass() {
        let enforcer = QualityEnforcer::default();
        for term in ["J. R. R. Tolkien style", "Picture this reasoning", "Let's say   momentum"] {
            let doc = doc_with(vec![section_with(vec![concept(term, "a way of writing.", "")])]);
            let (once, _) = enforcer.enforce(doc);
            let example = &once.summary.sections[0].concepts[0].example;
            assert!(example.starts_with("For instance, "), "unexpected example: {}", example);
            assert_eq!(sentences(example).len(), 1);

            let (twice, second) = enforcer.enforce(once.clone());
            assert_eq!(once, twice);
            assert!(second.is_clean(), "second pass changed: {}", second.summary());
        }
    }

    #[test]
    fn test_filler_matches_across_extra_whitespace() {
        let doc = doc_with(vec![section_with(vec![concept(
            "Free fall",
            "Motion under gravity alone.",
            "Imagine  that a ball drops 5 m.",
        )])]);
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.summary.sections[0].concepts[0].example, "A ball drops 5 m.");
        assert_eq!(metrics.filler_phrases_removed, 1);
    }

    #[test]
    fn test_control_flow_moves_to_pseudocode() {
        let mut doc = doc_with(Vec::new());
        doc.summary.formula_sheet.push(FormulaEntry {
            name: "Absolute value".to_string(),
            expression: "|x| = x; if x < 0 return -x".to_string(),
            ..Default::default()
        });
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        let formula = &doc.summary.formula_sheet[0];
        assert_eq!(formula.expression, "|x| = x");
        assert_eq!(formula.pseudocode, "if x < 0 return -x");
        assert_eq!(metrics.formulas_split, 1);
    }

    #[test]
    fn test_near_duplicate_sentences_removed() {
        let mut doc = doc_with(Vec::new());
        doc.summary.overview =
            "Velocity measures motion. Velocity measures motion! Acceleration changes velocity.".to_string();
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.summary.overview, "Velocity measures motion. Acceleration changes velocity.");
        assert_eq!(metrics.duplicate_sentences_removed, 1);
    }

    #[test]
    fn test_dedup_concepts_and_glossary() {
        let mut doc = doc_with(vec![section_with(vec![
            concept("Velocity", "Speed with direction.", "5 m/s"),
            concept("velocity", "Duplicate.", "6 m/s"),
        ])]);
        doc.summary.glossary = vec![
            GlossaryEntry {
                term: "Mass".to_string(),
                definition: "Amount of matter".to_string(),
            },
            GlossaryEntry {
                term: "MASS".to_string(),
                definition: "Again".to_string(),
            },
        ];
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.summary.sections[0].concepts.len(), 1);
        assert_eq!(doc.summary.glossary.len(), 1);
        assert_eq!(metrics.duplicate_concepts_removed, 1);
        assert_eq!(metrics.duplicate_glossary_removed, 1);
    }

    #[test]
    fn test_citations_normalized() {
        let cited = Citation {
            source_ref: " chunk-1 ".to_string(),
            section_or_heading: "Kinematics".to_string(),
            evidence: "x".repeat(250),
            ..Default::default()
        };
        let mut doc = doc_with(Vec::new());
        doc.citations = vec![cited.clone(), cited, Citation::default()];
        let (doc, metrics) = QualityEnforcer::default().enforce(doc);
        assert_eq!(doc.citations.len(), 1);
        assert_eq!(doc.citations[0].source_ref, "chunk-1");
        assert_eq!(doc.citations[0].evidence.chars().count(), 200);
        assert_eq!(metrics.citations_dropped, 2);
    }

    #[test]
    fn test_coverage_clamped() {
        let mut doc = doc_with(Vec::new());
        doc.coverage = Some(Coverage {
            score: 1.7,
            missing_topics: (0..30).map(|i| format!("topic {}", i)).collect(),
        });
        let (doc, _) = QualityEnforcer::default().enforce(doc);
        let coverage = doc.coverage.unwrap();
        assert_eq!(coverage.score, 1.0);
        assert_eq!(coverage.missing_topics.len(), 20);
    }

    #[test]
    fn test_enforce_is_idempotent() {
        let mut doc = doc_with(vec![
            section_with(vec![
                concept("Velocity", "Rate of change of position.", "Let's say a car covers 100 m in 20 s. It moves. It stops. It waits."),
                concept("Inertia", "Resistance to change in motion.", ""),
                concept("Treaty of Paris", "Signed in 1783.", ""),
                concept("velocity", "dup", ""),
            ]),
            Section::default(),
        ]);
        doc.summary.overview = "Motion is change. Motion is change. Forces cause it.".to_string();
        doc.summary.formula_sheet.push(FormulaEntry {
            name: "Clamp".to_string(),
            expression: "y = x\nwhile y > 1 repeat halve".to_string(),
            pseudocode: "start".to_string(),
            ..Default::default()
        });
        doc.coverage = Some(Coverage {
            score: -0.2,
            missing_topics: vec![" Optics ".to_string()],
        });

        let enforcer = QualityEnforcer::default();
        let (once, first) = enforcer.enforce(doc);
        assert!(!first.is_clean());
        let (twice, second) = enforcer.enforce(once.clone());
        assert_eq!(once, twice);
        assert!(second.is_clean(), "second pass changed: {}", second.summary());
    }

    const TERMS: &[&str] = &[
        "Velocity",
        "velocity",
        "J. R. R. Tolkien style",
        "Picture this reasoning",
        "Treaty of Paris",
        "e.g. force",
        "Ohm's law?",
        "",
    ];
    const DEFINITIONS: &[&str] = &[
        "",
        "Rate of change of position.",
        "Signed in 1783.",
        "a way of writing.",
        "Energy is 5 J per 2 s. It adds up. It keeps going.",
    ];
    const EXAMPLES: &[&str] = &[
        "",
        "Let's say a car covers 100 m in 20 s. It moves. It stops.",
        "Picture this",
        "imagine  that a ball falls.",
        "One. Two. Three. Four.",
        "A 3.5 kg mass rests on a table.",
    ];
    const EXPLANATIONS: &[&str] = &["", "It repeats. It repeats. It differs slightly here.", "Mass resists force."];

    fn arb_concept() -> impl Strategy<Value = ConceptEntry> {
        (
            prop::sample::select(TERMS.to_vec()),
            prop::sample::select(DEFINITIONS.to_vec()),
            prop::sample::select(EXAMPLES.to_vec()),
            prop::sample::select(EXPLANATIONS.to_vec()),
        )
            .prop_map(|(term, definition, example, explanation)| ConceptEntry {
                term: format!(" {} ", term),
                definition: definition.to_string(),
                example: example.to_string(),
                explanation: explanation.to_string(),
                ..Default::default()
            })
    }

    fn arb_document() -> impl Strategy<Value = FinalDocument> {
        prop::collection::vec(prop::collection::vec(arb_concept(), 0..5), 1..4).prop_map(|sections| {
            doc_with(sections.into_iter().map(section_with).collect())
        })
    }

    proptest! {
        #[test]
        fn prop_enforce_is_idempotent(doc in arb_document()) {
            let enforcer = QualityEnforcer::default();
            let (once, _) = enforcer.enforce(doc);
            let (twice, second) = enforcer.enforce(once.clone());
            prop_assert_eq!(&once, &twice);
            prop_assert!(second.is_clean(), "second pass changed: {}", second.summary());
        }
    }

    #[test]
    fn test_render_prunes_empty_values() {
        let doc = doc_with(vec![section_with(vec![concept("Velocity", "Speed with direction.", "")])]);
        let rendered = QualityEnforcer::default().render(&doc);
        assert_eq!(
            rendered,
            json!({
                "summary": {
                    "title": "Physics",
                    "sections": [{
                        "heading": "Kinematics",
                        "concepts": [{"term": "Velocity", "definition": "Speed with direction."}]
                    }]
                }
            })
        );
    }

    #[test]
    fn test_prune_nested() {
        let value = json!({"a": {"b": [null, "", {}, []]}, "c": 0, "d": false});
        assert_eq!(prune(value), Some(json!({"c": 0, "d": false})));
        assert_eq!(prune(json!({})), None);
    }

    #[test]
    fn test_custom_filler_phrases() {
        let enforcer = QualityEnforcer::new(EnforcerConfig {
            filler_phrases: vec!["basically".to_string()],
            ..Default::default()
        })
        .unwrap();
        let doc = doc_with(vec![section_with(vec![concept("Mass", "Amount of matter.", "Basically, 2 kg of water.")])]);
        let (doc, _) = enforcer.enforce(doc);
        assert_eq!(doc.summary.sections[0].concepts[0].example, "2 kg of water.");
    }
}
