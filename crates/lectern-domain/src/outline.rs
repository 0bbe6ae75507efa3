//! Topology-only plan produced before any content is written

use crate::kind::ExampleKind;
use crate::lenient;
use serde::{Deserialize, Serialize};

/// Section and concept order for the study guide
///
/// Once the outline is frozen, FILL may not reorder it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    /// Working title
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,

    /// Ordered sections
    #[serde(default, deserialize_with = "lenient::vec_of")]
    pub sections: Vec<OutlineSection>,

    /// Formulas the guide should include
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub formula_plan: Vec<String>,

    /// Number of glossary entries to aim for
    #[serde(default, deserialize_with = "lenient::count")]
    pub glossary_target: usize,
}

/// A planned section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    /// Section heading
    #[serde(default, deserialize_with = "lenient::string", alias = "title")]
    pub heading: String,

    /// Planned concepts, in order
    #[serde(default, deserialize_with = "outline_concepts")]
    pub concepts: Vec<OutlineConcept>,
}

/// A planned concept
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineConcept {
    /// Concept name
    #[serde(default, deserialize_with = "lenient::string", alias = "name")]
    pub term: String,

    /// The kind of example FILL must write
    #[serde(default, deserialize_with = "lenient::example_kind", skip_serializing_if = "Option::is_none")]
    pub expected_example_kind: Option<ExampleKind>,
}

// Models often list concepts as bare strings.
fn outline_concepts<'de, D>(deserializer: D) -> Result<Vec<OutlineConcept>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(term) if !term.trim().is_empty() => Some(OutlineConcept {
                term: term.trim().to_string(),
                expected_example_kind: None,
            }),
            obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
            _ => None,
        })
        .collect())
}

impl Outline {
    /// Section headings in order
    pub fn headings(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.heading.as_str()).collect()
    }

    /// Whether the outline has no usable section
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.heading.trim().is_empty())
    }

    /// Drop sections without a heading
    pub fn retain_named_sections(&mut self) {
        self.sections.retain(|s| !s.heading.trim().is_empty());
    }

    /// Index of the section whose heading matches `heading` case-insensitively
    pub fn position_of(&self, heading: &str) -> Option<usize> {
        let needle = heading.trim().to_lowercase();
        self.sections
            .iter()
            .position(|s| s.heading.trim().to_lowercase() == needle)
    }

    /// Whether `theme` is covered by some section heading
    ///
    /// A case-insensitive substring match in either direction.
    pub fn covers_theme(&self, theme: &str) -> bool {
        let theme = theme.trim().to_lowercase();
        if theme.is_empty() {
            return true;
        }
        self.sections.iter().any(|s| {
            let heading = s.heading.trim().to_lowercase();
            !heading.is_empty() && (heading.contains(&theme) || theme.contains(&heading))
        })
    }

    /// Themes not covered by any section heading, in input order
    pub fn missing_themes<'a>(&self, themes: &'a [String]) -> Vec<&'a String> {
        themes.iter().filter(|t| !self.covers_theme(t)).collect()
    }

    /// Total planned concepts
    pub fn concept_count(&self) -> usize {
        self.sections.iter().map(|s| s.concepts.len()).sum()
    }
}
