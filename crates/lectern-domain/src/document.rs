//! The delivered study-guide document

use crate::kind::ExampleKind;
use crate::lenient;
use serde::{Deserialize, Serialize};

/// Heading used for the section that reports a pipeline failure
pub const ERROR_SECTION_HEADING: &str = "Error Details";

/// The externally delivered result of summarization
///
/// Empty optional fields are never serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalDocument {
    /// The study guide itself
    #[serde(default)]
    pub summary: StudySummary,

    /// Document-level citations back to the source
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,

    /// Coverage measured against the source (attached post-hoc)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
}

/// Study-guide body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySummary {
    /// Guide title
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Short overview paragraph
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub overview: String,

    /// What the reader should be able to do afterwards
    #[serde(default, deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub learning_objectives: Vec<String>,

    /// Sections in outline order
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,

    /// Formula sheet
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub formula_sheet: Vec<FormulaEntry>,

    /// Diagram descriptions
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub diagrams: Vec<Diagram>,

    /// Pseudocode blocks
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub pseudocode: Vec<PseudocodeBlock>,

    /// Practice problems
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub practice_problems: Vec<PracticeProblem>,

    /// Glossary
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub glossary: Vec<GlossaryEntry>,
}

/// A section of the study guide
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Section heading
    #[serde(default, deserialize_with = "lenient::string", alias = "title")]
    pub heading: String,

    /// Free-text summary of the section
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub summary: String,

    /// Concepts covered in this section
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<ConceptEntry>,

    /// Section-level citations
    #[serde(default, deserialize_with = "lenient::vec_of", skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// A concept inside a section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEntry {
    /// Concept name
    #[serde(default, deserialize_with = "lenient::string", alias = "name")]
    pub term: String,

    /// One-sentence definition
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub definition: String,

    /// Longer explanation
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub explanation: String,

    /// Concrete example
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub example: String,

    /// Bullet points, used when no example fits
    #[serde(default, deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,

    /// Example kind declared by the outline
    #[serde(default, deserialize_with = "lenient::example_kind", skip_serializing_if = "Option::is_none")]
    pub example_kind: Option<ExampleKind>,
}

impl ConceptEntry {
    /// The concept's own text (definition plus explanation)
    pub fn home_text(&self) -> String {
        [self.definition.as_str(), self.explanation.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A formula-sheet entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaEntry {
    /// Formula name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Mathematical expression only
    #[serde(default, deserialize_with = "lenient::string", alias = "formula", skip_serializing_if = "String::is_empty")]
    pub expression: String,

    /// Variable definitions
    #[serde(default, deserialize_with = "lenient::variables", skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,

    /// Worked example with real numbers
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub worked_example: String,

    /// Control-flow text moved out of the expression
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub pseudocode: String,

    /// Where the formula appears in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

/// A formula variable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Symbol as written in the expression
    #[serde(default, deserialize_with = "lenient::string")]
    pub symbol: String,

    /// What the symbol stands for
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub meaning: String,
}

/// A diagram description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    /// Diagram title
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,

    /// Diagram type (flowchart, timeline, graph...)
    #[serde(default, deserialize_with = "lenient::string", rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Body (mermaid, ASCII, or a description)
    #[serde(default, deserialize_with = "lenient::string", alias = "description", skip_serializing_if = "String::is_empty")]
    pub content: String,
}

/// A pseudocode block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PseudocodeBlock {
    /// Block title
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,

    /// Pseudocode body
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub code: String,
}

/// A practice problem
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeProblem {
    /// Problem statement
    #[serde(default, deserialize_with = "lenient::string", alias = "problem")]
    pub question: String,

    /// Worked solution
    #[serde(default, deserialize_with = "lenient::string", alias = "answer", skip_serializing_if = "String::is_empty")]
    pub solution: String,

    /// Difficulty label
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub difficulty: String,
}

/// A glossary entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryEntry {
    /// Term
    #[serde(default, deserialize_with = "lenient::string")]
    pub term: String,

    /// Definition
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub definition: String,
}

/// Pointer from generated content back into the source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Source identifier, e.g. "chunk 3"
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub source_ref: String,

    /// Section or heading the evidence sits under
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub section_or_heading: String,

    /// Page range when known
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub page_range: String,

    /// Supporting quote, at most 200 characters
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub evidence: String,
}

impl Citation {
    /// Whether the citation points at nothing
    pub fn is_empty(&self) -> bool {
        self.source_ref.trim().is_empty() && self.section_or_heading.trim().is_empty()
    }
}

/// Coverage of source topics by the generated document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    /// Fraction of source topics matched, in [0, 1]
    #[serde(default)]
    pub score: f64,

    /// Unmatched source topics (at most 20)
    #[serde(default)]
    pub missing_topics: Vec<String>,
}

impl FinalDocument {
    /// Minimal well-formed document describing a pipeline failure
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            summary: StudySummary {
                title: "Summary unavailable".to_string(),
                overview: "The study guide could not be generated for this document.".to_string(),
                sections: vec![Section {
                    heading: ERROR_SECTION_HEADING.to_string(),
                    summary: reason.clone(),
                    concepts: vec![ConceptEntry {
                        term: "Failure reason".to_string(),
                        definition: reason,
                        key_points: vec!["Retry the request or submit a smaller document.".to_string()],
                        ..Default::default()
                    }],
                    citations: Vec::new(),
                }],
                ..Default::default()
            },
            citations: Vec::new(),
            coverage: None,
        }
    }

    /// Whether this document is a failure report
    pub fn is_failure(&self) -> bool {
        self.summary
            .sections
            .iter()
            .any(|s| s.heading == ERROR_SECTION_HEADING)
    }

    /// All concepts across sections, in order
    pub fn concepts(&self) -> impl Iterator<Item = &ConceptEntry> {
        self.summary.sections.iter().flat_map(|s| s.concepts.iter())
    }
}
