//! Lectern Janitor
//!
//! Deterministic post-processing and background maintenance.
//!
//! # Overview
//!
//! The Janitor is responsible for:
//! - **Quality enforcement**: Cleaning finished study guides without model calls
//! - **Cache eviction**: Removing cached responses past their TTL
//! - **Metrics collection**: Counting what each cleanup or sweep changed
//!
//! # Usage
//!
//! ## Cleaning a Document
//!
//! ```
//! use lectern_domain::FinalDocument;
//! use lectern_janitor::QualityEnforcer;
//!
//! let enforcer = QualityEnforcer::default();
//! let (doc, metrics) = enforcer.enforce(FinalDocument::default());
//! let json = enforcer.render(&doc);
//! assert!(json.is_object());
//! println!("{}", metrics.summary());
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use lectern_janitor::{JanitorWorker, JanitorConfig};
//! use lectern_store::SqliteResponseCache;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(SqliteResponseCache::new("lectern.db")?);
//!     let mut worker = JanitorWorker::new(JanitorConfig::default(), cache);
//!
//!     // Run for 3 cycles then stop
//!     worker.run_cycles(3).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The Janitor can be configured via TOML:
//!
//! ```toml
//! [janitor]
//! cache_ttl_days = 7
//! sweep_interval_minutes = 60
//! ```

#![warn(missing_docs)]

mod config;
pub mod enforcer;
mod error;
mod janitor;
mod metrics;
mod worker;

pub use config::{EnforcerConfig, JanitorConfig};
pub use enforcer::QualityEnforcer;
pub use error::JanitorError;
pub use janitor::CacheJanitor;
pub use metrics::{CleanupMetrics, SweepMetrics};
pub use worker::JanitorWorker;
