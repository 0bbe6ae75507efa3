//! Classification labels used to steer prompts and validation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document-level domain label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentDomain {
    /// Math, engineering, computing, natural sciences
    Technical,
    /// History, law, politics, sociology, literature
    Social,
    /// Manuals, guides, step-by-step procedures
    Procedural,
    /// Anything without a clear majority signal
    #[default]
    General,
}

impl DocumentDomain {
    /// Get the domain name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentDomain::Technical => "technical",
            DocumentDomain::Social => "social",
            DocumentDomain::Procedural => "procedural",
            DocumentDomain::General => "general",
        }
    }

    /// Parse a domain from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "technical" => Some(DocumentDomain::Technical),
            "social" => Some(DocumentDomain::Social),
            "procedural" => Some(DocumentDomain::Procedural),
            "general" => Some(DocumentDomain::General),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concept-level domain label used during quality enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptDomain {
    /// Quantitative: numbers, notation, computation
    Quant,
    /// Qualitative: named entities, dates, cases
    Qual,
    /// Mixed or no clear signal
    Semi,
}

impl ConceptDomain {
    /// The example kind a concept of this domain should carry
    pub fn preferred_example_kind(&self) -> ExampleKind {
        match self {
            ConceptDomain::Quant => ExampleKind::Numeric,
            ConceptDomain::Qual | ConceptDomain::Semi => ExampleKind::Anchored,
        }
    }
}

/// Kind of example an outline concept expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleKind {
    /// Real numbers and a computation
    Numeric,
    /// Dates, names, or concrete cases
    #[default]
    Anchored,
}

impl ExampleKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExampleKind::Numeric => "numeric",
            ExampleKind::Anchored => "anchored",
        }
    }
}

impl fmt::Display for ExampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_round_trip() {
        for domain in [
            DocumentDomain::Technical,
            DocumentDomain::Social,
            DocumentDomain::Procedural,
            DocumentDomain::General,
        ] {
            assert_eq!(DocumentDomain::parse(domain.as_str()), Some(domain));
        }
        assert_eq!(DocumentDomain::parse("astrology"), None);
    }

    #[test]
    fn test_concept_domain_example_kind() {
        assert_eq!(ConceptDomain::Quant.preferred_example_kind(), ExampleKind::Numeric);
        assert_eq!(ConceptDomain::Qual.preferred_example_kind(), ExampleKind::Anchored);
    }

    #[test]
    fn test_example_kind_deserializes_lowercase() {
        let kind: ExampleKind = serde_json::from_str("\"numeric\"").unwrap();
        assert_eq!(kind, ExampleKind::Numeric);
    }
}
