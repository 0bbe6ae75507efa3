//! Lectern Gatekeeper
//!
//! Deterministic quality checks for generated study guides.
//!
//! The Gatekeeper provides:
//! - Document validation (section counts, example kinds, formulas, element counts, citations)
//! - Coverage measurement of generated topics against source topics
//! - Keyword heuristics classifying documents and concepts by domain
//!
//! # Examples
//!
//! ```
//! use lectern_domain::{DocumentDomain, FinalDocument};
//! use lectern_gatekeeper::{DocumentValidator, ValidationConfig};
//!
//! let validator = DocumentValidator::new(ValidationConfig::default());
//! let issues = validator.validate(&FinalDocument::default(), None, DocumentDomain::General);
//! assert!(!issues.is_empty());
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod coverage;
mod config;
mod error;
mod validator;

pub use config::{CountRange, CountThresholds, CoverageConfig, DomainThresholds, ValidationConfig};
pub use coverage::CoverageValidator;
pub use error::GatekeeperError;
pub use validator::{format_issues, DocumentValidator, ValidationIssue};
