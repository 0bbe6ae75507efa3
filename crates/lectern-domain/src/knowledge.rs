//! MAP-phase output and its aggregate

use crate::document::Variable;
use crate::lenient;
use serde::{Deserialize, Serialize};

/// Shortest a text field is cut to when shrinking a prompt payload
const MIN_FIELD_CHARS: usize = 80;

/// Where an extracted item came from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Index of the chunk in document order
    pub chunk_index: usize,

    /// Heading path of the chunk
    #[serde(default)]
    pub heading_path: Vec<String>,
}

/// A concept extracted from a chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedConcept {
    /// Concept name
    #[serde(default, deserialize_with = "lenient::string", alias = "name")]
    pub term: String,

    /// Definition
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub definition: String,

    /// Explanation
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub explanation: String,

    /// Example from the source, if any
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub example: String,

    /// Provenance, set during aggregation
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// A formula extracted from a chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFormula {
    /// Formula name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Expression
    #[serde(default, deserialize_with = "lenient::string", alias = "formula", skip_serializing_if = "String::is_empty")]
    pub expression: String,

    /// Variable definitions
    #[serde(default, deserialize_with = "lenient::variables", skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,

    /// Worked example
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub worked_example: String,

    /// Provenance, set during aggregation
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// A theorem extracted from a chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTheorem {
    /// Theorem name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Statement
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub statement: String,

    /// Proof sketch
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub proof_sketch: String,

    /// Where the theorem is applied
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub application: String,

    /// Provenance, set during aggregation
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// A worked example extracted from a chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedExample {
    /// Setup of the example
    #[serde(default, deserialize_with = "lenient::string")]
    pub context: String,

    /// Solution
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub solution: String,

    /// Takeaway
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub key_insight: String,

    /// Provenance, set during aggregation
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// Structured mini-document extracted from one chunk
///
/// Absent arrays mean "none found".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedKnowledge {
    /// Concepts
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<ExtractedConcept>,

    /// Formulas
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<ExtractedFormula>,

    /// Theorems
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub theorems: Vec<ExtractedTheorem>,

    /// Examples
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExtractedExample>,
}

impl ExtractedKnowledge {
    /// A single concept standing in for output that could not be parsed
    pub fn fallback(term: impl Into<String>, raw_text: &str, max_chars: usize) -> Self {
        let summary: String = raw_text.trim().chars().take(max_chars).collect();
        Self {
            concepts: vec![ExtractedConcept {
                term: term.into(),
                definition: summary,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Total number of items across all categories
    pub fn item_count(&self) -> usize {
        self.concepts.len() + self.formulas.len() + self.theorems.len() + self.examples.len()
    }

    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Tag every item with its chunk of origin
    pub fn tag_source(&mut self, source: &SourceRef) {
        for c in &mut self.concepts {
            c.source = Some(source.clone());
        }
        for f in &mut self.formulas {
            f.source = Some(source.clone());
        }
        for t in &mut self.theorems {
            t.source = Some(source.clone());
        }
        for e in &mut self.examples {
            e.source = Some(source.clone());
        }
    }

    /// Append another extraction, preserving order (no dedup)
    pub fn extend(&mut self, other: ExtractedKnowledge) {
        self.concepts.extend(other.concepts);
        self.formulas.extend(other.formulas);
        self.theorems.extend(other.theorems);
        self.examples.extend(other.examples);
    }
}

/// All chunks' knowledge concatenated in chunk order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedKnowledge {
    /// Concatenated items
    #[serde(flatten)]
    pub knowledge: ExtractedKnowledge,

    /// Number of chunks aggregated
    pub chunk_count: usize,
}

impl AggregatedKnowledge {
    /// Aggregate tagged per-chunk extractions (already ordered by chunk index)
    pub fn from_chunks(chunks: impl IntoIterator<Item = ExtractedKnowledge>) -> Self {
        let mut knowledge = ExtractedKnowledge::default();
        let mut chunk_count = 0;
        for chunk in chunks {
            knowledge.extend(chunk);
            chunk_count += 1;
        }
        Self {
            knowledge,
            chunk_count,
        }
    }

    /// Distinct top-level heading labels across item sources, first-seen order
    pub fn themes(&self) -> Vec<String> {
        let k = &self.knowledge;
        let sources = k
            .concepts
            .iter()
            .map(|c| c.source.as_ref())
            .chain(k.formulas.iter().map(|f| f.source.as_ref()))
            .chain(k.theorems.iter().map(|t| t.source.as_ref()))
            .chain(k.examples.iter().map(|e| e.source.as_ref()));

        let mut indexed: Vec<(usize, String)> = sources
            .flatten()
            .filter_map(|s| {
                s.heading_path
                    .first()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .map(|h| (s.chunk_index, h))
            })
            .collect();
        // Stable sort keeps within-chunk order; chunk order defines "first seen".
        indexed.sort_by_key(|(idx, _)| *idx);

        let mut themes: Vec<String> = Vec::new();
        for (_, heading) in indexed {
            if !themes.iter().any(|t| t.eq_ignore_ascii_case(&heading)) {
                themes.push(heading);
            }
        }
        themes
    }

    /// Item counts as (concepts, formulas, theorems)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.knowledge.concepts.len(),
            self.knowledge.formulas.len(),
            self.knowledge.theorems.len(),
        )
    }

    /// Serialize for a prompt, shrinking content until it fits `max_chars`
    ///
    /// Long text fields are halved first (never below a floor); only then are
    /// trailing items dropped from the largest category, in batches sized from
    /// the remaining overshoot. The result is always valid JSON.
    pub fn to_prompt_json(&self, max_chars: usize) -> String {
        let mut working = self.knowledge.clone();
        let mut json = serialize(&working);
        if json.chars().count() <= max_chars {
            return json;
        }

        let mut field_cap = longest_field(&working);
        while json.chars().count() > max_chars && field_cap > MIN_FIELD_CHARS {
            field_cap = (field_cap / 2).max(MIN_FIELD_CHARS);
            shorten_fields(&mut working, field_cap);
            json = serialize(&working);
        }

        let mut len = json.chars().count();
        while len > max_chars && !working.is_empty() {
            for _ in 0..drop_batch(len, max_chars, working.item_count()) {
                drop_from_largest(&mut working);
            }
            json = serialize(&working);
            len = json.chars().count();
        }
        json
    }
}

/// Items to drop next: half the count the overshoot suggests at the average
/// item size, at least one
fn drop_batch(json_chars: usize, max_chars: usize, items: usize) -> usize {
    if items == 0 {
        return 0;
    }
    let per_item = (json_chars / items).max(1);
    (json_chars.saturating_sub(max_chars) / per_item / 2).clamp(1, items)
}

fn serialize(knowledge: &ExtractedKnowledge) -> String {
    serde_json::to_string(knowledge).unwrap_or_else(|_| "{}".to_string())
}

fn truncate_chars(s: &mut String, cap: usize) {
    if s.chars().count() > cap {
        *s = s.chars().take(cap).collect();
    }
}

fn longest_field(k: &ExtractedKnowledge) -> usize {
    let lens = k
        .concepts
        .iter()
        .flat_map(|c| [&c.definition, &c.explanation, &c.example])
        .chain(k.formulas.iter().flat_map(|f| [&f.expression, &f.worked_example]))
        .chain(k.theorems.iter().flat_map(|t| [&t.statement, &t.proof_sketch, &t.application]))
        .chain(k.examples.iter().flat_map(|e| [&e.context, &e.solution, &e.key_insight]))
        .map(|s| s.chars().count());
    lens.max().unwrap_or(0)
}

fn shorten_fields(k: &mut ExtractedKnowledge, cap: usize) {
    for c in &mut k.concepts {
        truncate_chars(&mut c.definition, cap);
        truncate_chars(&mut c.explanation, cap);
        truncate_chars(&mut c.example, cap);
    }
    for f in &mut k.formulas {
        truncate_chars(&mut f.worked_example, cap);
    }
    for t in &mut k.theorems {
        truncate_chars(&mut t.statement, cap);
        truncate_chars(&mut t.proof_sketch, cap);
        truncate_chars(&mut t.application, cap);
    }
    for e in &mut k.examples {
        truncate_chars(&mut e.context, cap);
        truncate_chars(&mut e.solution, cap);
        truncate_chars(&mut e.key_insight, cap);
    }
}

fn drop_from_largest(k: &mut ExtractedKnowledge) {
    let sizes = [
        k.concepts.len(),
        k.formulas.len(),
        k.theorems.len(),
        k.examples.len(),
    ];
    let largest = sizes
        .iter()
        .enumerate()
        .max_by_key(|(_, n)| **n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    match largest {
        0 => {
            k.concepts.pop();
        }
        1 => {
            k.formulas.pop();
        }
        2 => {
            k.theorems.pop();
        }
        _ => {
            k.examples.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(term: &str, chunk: usize, heading: &str) -> ExtractedConcept {
        ExtractedConcept {
            term: term.to_string(),
            definition: format!("{} definition", term),
            source: Some(SourceRef {
                chunk_index: chunk,
                heading_path: vec![heading.to_string(), "Sub".to_string()],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_themes_distinct_in_chunk_order() {
        let mut k = ExtractedKnowledge::default();
        k.concepts.push(concept("b", 1, "Waves"));
        k.concepts.push(concept("a", 0, "Optics"));
        k.concepts.push(concept("c", 2, "optics"));
        let agg = AggregatedKnowledge {
            knowledge: k,
            chunk_count: 3,
        };
        assert_eq!(agg.themes(), vec!["Optics", "Waves"]);
    }

    #[test]
    fn test_source_serialized_as_underscore_source() {
        let c = concept("x", 4, "H");
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"_source\":{\"chunkIndex\":4"));
    }

    #[test]
    fn test_fallback_is_visible_concept() {
        let k = ExtractedKnowledge::fallback("Unparsed chunk 2", "raw model text", 100);
        assert_eq!(k.concepts.len(), 1);
        assert_eq!(k.concepts[0].definition, "raw model text");
    }

    #[test]
    fn test_prompt_json_fits_limit_and_stays_valid() {
        let mut k = ExtractedKnowledge::default();
        for i in 0..50 {
            let mut c = concept(&format!("term{}", i), i, "Heading");
            c.explanation = "x".repeat(2_000);
            k.concepts.push(c);
        }
        let agg = AggregatedKnowledge::from_chunks(vec![k]);
        let json = agg.to_prompt_json(20_000);
        assert!(json.chars().count() <= 20_000);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        // Structure survives: all 50 concepts kept, only content shortened
        assert_eq!(parsed["concepts"].as_array().unwrap().len(), 50);
    }

    #[test]
    fn test_prompt_json_drops_items_when_shortening_is_not_enough() {
        let mut k = ExtractedKnowledge::default();
        for i in 0..200 {
            k.concepts.push(concept(&format!("term{}", i), 0, "H"));
        }
        let agg = AggregatedKnowledge::from_chunks(vec![k]);
        let json = agg.to_prompt_json(2_000);
        assert!(json.chars().count() <= 2_000);
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
    }

    #[test]
    fn test_drop_batch_sized_from_overshoot() {
        assert_eq!(drop_batch(10_000, 5_000, 100), 25);
        assert_eq!(drop_batch(10_001, 10_000, 100), 1);
        assert_eq!(drop_batch(10_000, 0, 100), 50);
        assert_eq!(drop_batch(10_000, 0, 1), 1);
        assert_eq!(drop_batch(500, 100, 0), 0);
    }

    #[test]
    fn test_batched_drops_keep_output_near_limit() {
        let mut k = ExtractedKnowledge::default();
        for i in 0..2_000 {
            k.concepts.push(concept(&format!("term{}", i), i % 7, "Kinetics"));
        }
        let agg = AggregatedKnowledge::from_chunks(vec![k]);
        let json = agg.to_prompt_json(20_000);
        let len = json.chars().count();
        assert!(len <= 20_000);
        assert!(len > 19_000, "dropped too much: {} chars left", len);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["concepts"][0]["term"], "term0");
    }
}
