//! Gatekeeper configuration

use crate::GatekeeperError;
use lectern_domain::DocumentDomain;
use serde::{Deserialize, Serialize};

/// Inclusive count range for one kind of document element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Minimum count
    pub min: usize,
    /// Maximum count
    pub max: usize,
}

impl CountRange {
    /// Build a range
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Whether `n` lies inside the range
    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

impl std::fmt::Display for CountRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Diagram, pseudocode and practice-problem ranges for one document domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountThresholds {
    /// Diagrams expected
    pub diagrams: CountRange,
    /// Pseudocode blocks expected
    pub pseudocode: CountRange,
    /// Practice problems expected
    pub practice_problems: CountRange,
}

/// Thresholds keyed by document domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainThresholds {
    /// Technical documents
    pub technical: CountThresholds,
    /// History, law, literature and similar
    pub social: CountThresholds,
    /// How-to material
    pub procedural: CountThresholds,
    /// Everything else
    pub general: CountThresholds,
}

impl Default for DomainThresholds {
    fn default() -> Self {
        Self {
            technical: CountThresholds {
                diagrams: CountRange::new(2, 4),
                pseudocode: CountRange::new(2, 3),
                practice_problems: CountRange::new(3, 5),
            },
            social: CountThresholds {
                diagrams: CountRange::new(1, 4),
                pseudocode: CountRange::new(0, 3),
                practice_problems: CountRange::new(3, 5),
            },
            procedural: CountThresholds {
                diagrams: CountRange::new(1, 4),
                pseudocode: CountRange::new(1, 3),
                practice_problems: CountRange::new(2, 5),
            },
            general: CountThresholds {
                diagrams: CountRange::new(1, 4),
                pseudocode: CountRange::new(0, 3),
                practice_problems: CountRange::new(3, 5),
            },
        }
    }
}

impl DomainThresholds {
    /// Thresholds for `domain`
    pub fn for_domain(&self, domain: DocumentDomain) -> &CountThresholds {
        match domain {
            DocumentDomain::Technical => &self.technical,
            DocumentDomain::Social => &self.social,
            DocumentDomain::Procedural => &self.procedural,
            DocumentDomain::General => &self.general,
        }
    }
}

/// Configuration for document validation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum number of sections in a filled document
    pub min_sections: usize,

    /// Report outline sections absent from the document
    pub validate_outline_sections: bool,

    /// Require every concept to carry an example or key points
    pub validate_concept_examples: bool,

    /// Check examples against the outline's expected kind
    pub validate_example_kinds: bool,

    /// Require expression and numeric worked example per formula
    pub validate_formulas: bool,

    /// Check diagram, pseudocode and practice-problem counts
    pub validate_counts: bool,

    /// Require citations on every section
    pub validate_citations: bool,

    /// Per-domain count ranges
    pub thresholds: DomainThresholds,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_sections: 4,
            validate_outline_sections: true,
            validate_concept_examples: true,
            validate_example_kinds: true,
            validate_formulas: true,
            validate_counts: true,
            validate_citations: true,
            thresholds: DomainThresholds::default(),
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (structure checks only)
    pub fn permissive() -> Self {
        Self {
            min_sections: 1,
            validate_outline_sections: true,
            validate_concept_examples: false,
            validate_example_kinds: false,
            validate_formulas: false,
            validate_counts: false,
            validate_citations: false,
            thresholds: DomainThresholds::default(),
        }
    }

    /// Create a strict configuration (all checks, higher section floor)
    pub fn strict() -> Self {
        Self {
            min_sections: 6,
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.min_sections == 0 {
            return Err(GatekeeperError::Config("min_sections must be greater than 0".to_string()));
        }
        let t = &self.thresholds;
        for (domain, thresholds) in [
            ("technical", &t.technical),
            ("social", &t.social),
            ("procedural", &t.procedural),
            ("general", &t.general),
        ] {
            for (what, range) in [
                ("diagrams", &thresholds.diagrams),
                ("pseudocode", &thresholds.pseudocode),
                ("practiceProblems", &thresholds.practice_problems),
            ] {
                if range.min > range.max {
                    return Err(GatekeeperError::Config(format!(
                        "{} {} range is inverted ({})",
                        domain, what, range
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Configuration for coverage measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Best similarity a source topic needs to count as matched (0.0-1.0)
    pub similarity_threshold: f64,

    /// Coverage score below which one regeneration is triggered (0.0-1.0)
    pub coverage_threshold: f64,

    /// Maximum number of source topics extracted
    pub max_source_topics: usize,

    /// Maximum number of missing topics reported
    pub max_missing_topics: usize,

    /// Maximum number of missing topics injected into a regeneration
    pub max_hint_topics: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            coverage_threshold: 0.85,
            max_source_topics: 200,
            max_missing_topics: 20,
            max_hint_topics: 10,
        }
    }
}

impl CoverageConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(GatekeeperError::Config(
                "similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(GatekeeperError::Config(
                "coverage_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.max_source_topics == 0 {
            return Err(GatekeeperError::Config(
                "max_source_topics must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.min_sections, 4);
        assert!(config.validate_citations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_permissive_config() {
        let config = ValidationConfig::permissive();
        assert!(!config.validate_counts);
        assert_eq!(config.min_sections, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = ValidationConfig::strict();
        assert_eq!(config.min_sections, 6);
        assert!(config.validate_example_kinds);
    }

    #[test]
    fn test_domain_thresholds() {
        let t = DomainThresholds::default();
        assert_eq!(t.for_domain(DocumentDomain::Technical).diagrams, CountRange::new(2, 4));
        assert_eq!(t.for_domain(DocumentDomain::Social).pseudocode.min, 0);
        assert_eq!(t.for_domain(DocumentDomain::Procedural).practice_problems, CountRange::new(2, 5));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = ValidationConfig::default();
        config.thresholds.general.diagrams = CountRange::new(5, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_coverage_validation() {
        assert!(CoverageConfig::default().validate().is_ok());
        let config = CoverageConfig {
            coverage_threshold: 1.5,
            ..CoverageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: ValidationConfig = toml::from_str("min_sections = 5\nvalidate_citations = false\n").unwrap();
        assert_eq!(config.min_sections, 5);
        assert!(!config.validate_citations);
        assert_eq!(config.thresholds, DomainThresholds::default());
    }
}
