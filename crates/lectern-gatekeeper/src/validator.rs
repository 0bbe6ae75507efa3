//! Deterministic validation of filled documents

use crate::classify::{has_anchored_signal, has_numeric_signal};
use crate::ValidationConfig;
use lectern_domain::{ConceptEntry, DocumentDomain, ExampleKind, FinalDocument, Outline};
use std::fmt;
use tracing::debug;

/// A content-quality shortfall found in a filled document
///
/// Issues are data: the display text is sent verbatim in a repair request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Fewer sections than the configured minimum
    TooFewSections {
        /// Sections present
        found: usize,
        /// Minimum required
        expected: usize,
    },

    /// An outline section has no counterpart in the document
    MissingOutlineSection(String),

    /// A concept carries neither an example nor key points
    ConceptWithoutExample {
        /// Section heading
        section: String,
        /// Concept term
        term: String,
    },

    /// A concept's example does not match its expected kind
    ExampleKindMismatch {
        /// Concept term
        term: String,
        /// Kind the outline asked for
        expected: ExampleKind,
    },

    /// A formula has no expression
    FormulaMissingExpression(String),

    /// A formula has no worked example with real numbers
    FormulaMissingWorkedExample(String),

    /// Diagram count outside the expected range
    DiagramCount {
        /// Diagrams present
        found: usize,
        /// Minimum expected
        min: usize,
        /// Maximum expected
        max: usize,
    },

    /// Pseudocode count outside the expected range
    PseudocodeCount {
        /// Blocks present
        found: usize,
        /// Minimum expected
        min: usize,
        /// Maximum expected
        max: usize,
    },

    /// Practice-problem count outside the expected range
    PracticeProblemCount {
        /// Problems present
        found: usize,
        /// Minimum expected
        min: usize,
        /// Maximum expected
        max: usize,
    },

    /// A section has no citations
    SectionMissingCitations(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSections { found, expected } => {
                write!(f, "too few sections ({}) expected ≥{}", found, expected)
            }
            Self::MissingOutlineSection(heading) => {
                write!(f, "outline section \"{}\" is missing", heading)
            }
            Self::ConceptWithoutExample { section, term } => write!(
                f,
                "concept \"{}\" in section \"{}\" has no example or key points",
                term, section
            ),
            Self::ExampleKindMismatch { term, expected } => match expected {
                ExampleKind::Numeric => write!(
                    f,
                    "concept \"{}\" needs a numeric example with real numbers and a computation",
                    term
                ),
                ExampleKind::Anchored => write!(
                    f,
                    "concept \"{}\" needs an anchored example naming a date, person or case",
                    term
                ),
            },
            Self::FormulaMissingExpression(name) => {
                write!(f, "formula \"{}\" has no expression", name)
            }
            Self::FormulaMissingWorkedExample(name) => {
                write!(f, "formula \"{}\" needs a worked example with numbers", name)
            }
            Self::DiagramCount { found, min, max } => {
                write!(f, "diagrams ({}) expected {}-{}", found, min, max)
            }
            Self::PseudocodeCount { found, min, max } => {
                write!(f, "pseudocode blocks ({}) expected {}-{}", found, min, max)
            }
            Self::PracticeProblemCount { found, min, max } => {
                write!(f, "practice problems ({}) expected {}-{}", found, min, max)
            }
            Self::SectionMissingCitations(heading) => {
                write!(f, "section \"{}\" has no citations", heading)
            }
        }
    }
}

/// Validates filled documents against the configured rules
#[derive(Debug, Clone, Default)]
pub struct DocumentValidator {
    config: ValidationConfig,
}

impl DocumentValidator {
    /// Create a validator with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a document
    ///
    /// # Arguments
    ///
    /// * `doc` - The filled document
    /// * `outline` - The frozen outline, if the document was filled from one
    /// * `domain` - Document domain, selecting the count thresholds
    ///
    /// # Returns
    ///
    /// Every issue found, in check order. An empty list means the document passes.
    pub fn validate(
        &self,
        doc: &FinalDocument,
        outline: Option<&Outline>,
        domain: DocumentDomain,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let summary = &doc.summary;

        // 1. Section count
        if summary.sections.len() < self.config.min_sections {
            issues.push(ValidationIssue::TooFewSections {
                found: summary.sections.len(),
                expected: self.config.min_sections,
            });
        }

        // 2. Outline coverage
        if self.config.validate_outline_sections {
            if let Some(outline) = outline {
                for heading in outline.headings() {
                    let wanted = heading.trim().to_lowercase();
                    let present = summary
                        .sections
                        .iter()
                        .any(|s| s.heading.trim().to_lowercase() == wanted);
                    if !present && !wanted.is_empty() {
                        issues.push(ValidationIssue::MissingOutlineSection(heading.to_string()));
                    }
                }
            }
        }

        // 3. Concepts
        for section in &summary.sections {
            for concept in &section.concepts {
                if self.config.validate_concept_examples
                    && concept.example.trim().is_empty()
                    && concept.key_points.iter().all(|p| p.trim().is_empty())
                {
                    issues.push(ValidationIssue::ConceptWithoutExample {
                        section: section.heading.clone(),
                        term: concept.term.clone(),
                    });
                    continue;
                }
                if self.config.validate_example_kinds {
                    if let Some(issue) = self.check_example_kind(concept, outline) {
                        issues.push(issue);
                    }
                }
            }
        }

        // 4. Formulas
        if self.config.validate_formulas {
            for formula in &summary.formula_sheet {
                if formula.expression.trim().is_empty() {
                    issues.push(ValidationIssue::FormulaMissingExpression(formula.name.clone()));
                }
                if !has_numeric_signal(&formula.worked_example) {
                    issues.push(ValidationIssue::FormulaMissingWorkedExample(formula.name.clone()));
                }
            }
        }

        // 5. Element counts
        if self.config.validate_counts {
            let t = self.config.thresholds.for_domain(domain);
            let found = summary.diagrams.len();
            if !t.diagrams.contains(found) {
                issues.push(ValidationIssue::DiagramCount {
                    found,
                    min: t.diagrams.min,
                    max: t.diagrams.max,
                });
            }
            let found = summary.pseudocode.len();
            if !t.pseudocode.contains(found) {
                issues.push(ValidationIssue::PseudocodeCount {
                    found,
                    min: t.pseudocode.min,
                    max: t.pseudocode.max,
                });
            }
            let found = summary.practice_problems.len();
            if !t.practice_problems.contains(found) {
                issues.push(ValidationIssue::PracticeProblemCount {
                    found,
                    min: t.practice_problems.min,
                    max: t.practice_problems.max,
                });
            }
        }

        // 6. Citations
        if self.config.validate_citations {
            for section in &summary.sections {
                if section.citations.iter().all(|c| c.is_empty()) {
                    issues.push(ValidationIssue::SectionMissingCitations(section.heading.clone()));
                }
            }
        }

        debug!("Validation found {} issues ({} domain)", issues.len(), domain);
        issues
    }

    fn check_example_kind(&self, concept: &ConceptEntry, outline: Option<&Outline>) -> Option<ValidationIssue> {
        if concept.example.trim().is_empty() {
            return None;
        }
        let expected = outline
            .and_then(|o| expected_kind(o, &concept.term))
            .or(concept.example_kind)?;
        let satisfied = match expected {
            ExampleKind::Numeric => has_numeric_signal(&concept.example),
            ExampleKind::Anchored => {
                has_anchored_signal(&concept.example) || has_numeric_signal(&concept.example)
            }
        };
        (!satisfied).then(|| ValidationIssue::ExampleKindMismatch {
            term: concept.term.clone(),
            expected,
        })
    }
}

fn expected_kind(outline: &Outline, term: &str) -> Option<ExampleKind> {
    let needle = term.trim().to_lowercase();
    outline
        .sections
        .iter()
        .flat_map(|s| s.concepts.iter())
        .find(|c| c.term.trim().to_lowercase() == needle)
        .and_then(|c| c.expected_example_kind)
}

/// Render issues as a numbered list for a repair request
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .enumerate()
        .map(|(i, issue)| format!("{}. {}", i + 1, issue))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_domain::{
        Citation, Diagram, FormulaEntry, OutlineConcept, OutlineSection, PracticeProblem,
        PseudocodeBlock, Section, StudySummary,
    };

    fn cited_section(heading: &str) -> Section {
        Section {
            heading: heading.to_string(),
            concepts: vec![ConceptEntry {
                term: format!("{} basics", heading),
                definition: "A definition.".to_string(),
                example: "In 1905 Einstein published 3 papers.".to_string(),
                ..Default::default()
            }],
            citations: vec![Citation {
                source_ref: "chunk-0".to_string(),
                section_or_heading: heading.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn passing_document(sections: usize) -> FinalDocument {
        FinalDocument {
            summary: StudySummary {
                title: "Physics".to_string(),
                sections: (0..sections).map(|i| cited_section(&format!("Topic {}", i))).collect(),
                diagrams: vec![Diagram::default(); 2],
                pseudocode: vec![PseudocodeBlock::default(); 2],
                practice_problems: vec![PracticeProblem::default(); 3],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_passing_document_has_no_issues() {
        let validator = DocumentValidator::default();
        let issues = validator.validate(&passing_document(4), None, DocumentDomain::Technical);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_too_few_sections_message() {
        let validator = DocumentValidator::default();
        let issues = validator.validate(&passing_document(3), None, DocumentDomain::Technical);
        assert_eq!(
            issues,
            vec![ValidationIssue::TooFewSections { found: 3, expected: 4 }]
        );
        assert_eq!(issues[0].to_string(), "too few sections (3) expected ≥4");
    }

    #[test]
    fn test_missing_outline_section() {
        let outline = Outline {
            sections: vec![
                OutlineSection {
                    heading: "Topic 0".to_string(),
                    concepts: Vec::new(),
                },
                OutlineSection {
                    heading: "Thermodynamics".to_string(),
                    concepts: Vec::new(),
                },
            ],
            ..Default::default()
        };
        let validator = DocumentValidator::default();
        let issues = validator.validate(&passing_document(4), Some(&outline), DocumentDomain::Technical);
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingOutlineSection("Thermodynamics".to_string())]
        );
    }

    #[test]
    fn test_concept_without_example() {
        let mut doc = passing_document(4);
        doc.summary.sections[1].concepts[0].example.clear();
        let issues = DocumentValidator::default().validate(&doc, None, DocumentDomain::Technical);
        assert!(matches!(issues[0], ValidationIssue::ConceptWithoutExample { .. }));
    }

    #[test]
    fn test_key_points_satisfy_example_rule() {
        let mut doc = passing_document(4);
        let concept = &mut doc.summary.sections[1].concepts[0];
        concept.example.clear();
        concept.key_points = vec!["First point".to_string()];
        assert!(DocumentValidator::default()
            .validate(&doc, None, DocumentDomain::Technical)
            .is_empty());
    }

    #[test]
    fn test_numeric_kind_requires_digits() {
        let mut doc = passing_document(4);
        doc.summary.sections[0].concepts[0].example = "Picture a moving car.".to_string();
        let outline = Outline {
            sections: vec![OutlineSection {
                heading: "Topic 0".to_string(),
                concepts: vec![OutlineConcept {
                    term: "topic 0 BASICS".to_string(),
                    expected_example_kind: Some(ExampleKind::Numeric),
                }],
            }],
            ..Default::default()
        };
        let issues = DocumentValidator::default().validate(&doc, Some(&outline), DocumentDomain::Technical);
        assert_eq!(
            issues,
            vec![ValidationIssue::ExampleKindMismatch {
                term: "Topic 0 basics".to_string(),
                expected: ExampleKind::Numeric,
            }]
        );
    }

    #[test]
    fn test_anchored_kind_accepts_names() {
        let mut doc = passing_document(4);
        let concept = &mut doc.summary.sections[0].concepts[0];
        concept.example = "As argued by Adam Smith.".to_string();
        concept.example_kind = Some(ExampleKind::Anchored);
        assert!(DocumentValidator::default()
            .validate(&doc, None, DocumentDomain::Technical)
            .is_empty());
    }

    #[test]
    fn test_formula_checks() {
        let mut doc = passing_document(4);
        doc.summary.formula_sheet.push(FormulaEntry {
            name: "Speed".to_string(),
            expression: String::new(),
            worked_example: "divide distance by time".to_string(),
            ..Default::default()
        });
        let issues = DocumentValidator::default().validate(&doc, None, DocumentDomain::Technical);
        assert_eq!(
            issues,
            vec![
                ValidationIssue::FormulaMissingExpression("Speed".to_string()),
                ValidationIssue::FormulaMissingWorkedExample("Speed".to_string()),
            ]
        );
    }

    #[test]
    fn test_counts_depend_on_domain() {
        let mut doc = passing_document(4);
        doc.summary.diagrams.truncate(1);
        doc.summary.pseudocode.clear();

        let technical = DocumentValidator::default().validate(&doc, None, DocumentDomain::Technical);
        assert_eq!(
            technical,
            vec![
                ValidationIssue::DiagramCount { found: 1, min: 2, max: 4 },
                ValidationIssue::PseudocodeCount { found: 0, min: 2, max: 3 },
            ]
        );
        assert_eq!(technical[0].to_string(), "diagrams (1) expected 2-4");

        let social = DocumentValidator::default().validate(&doc, None, DocumentDomain::Social);
        assert!(social.is_empty());
    }

    #[test]
    fn test_missing_citations() {
        let mut doc = passing_document(4);
        doc.summary.sections[2].citations.clear();
        let issues = DocumentValidator::default().validate(&doc, None, DocumentDomain::Technical);
        assert_eq!(
            issues,
            vec![ValidationIssue::SectionMissingCitations("Topic 2".to_string())]
        );
    }

    #[test]
    fn test_permissive_ignores_content_checks() {
        let mut doc = passing_document(2);
        doc.summary.diagrams.clear();
        doc.summary.sections[0].citations.clear();
        let validator = DocumentValidator::new(ValidationConfig::permissive());
        assert!(validator.validate(&doc, None, DocumentDomain::Technical).is_empty());
    }

    #[test]
    fn test_format_issues_numbers_lines() {
        let issues = vec![
            ValidationIssue::TooFewSections { found: 3, expected: 4 },
            ValidationIssue::FormulaMissingExpression("Speed".to_string()),
        ];
        assert_eq!(
            format_issues(&issues),
            "1. too few sections (3) expected ≥4\n2. formula \"Speed\" has no expression"
        );
    }
}
