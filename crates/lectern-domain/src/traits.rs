//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::UsageRecord;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a collaborator implementation
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Backing storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The collaborator is not reachable
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Observer that receives one record per generation call
///
/// Implemented by the infrastructure layer (lectern-store). The gateway logs
/// and drops any error returned here.
pub trait UsageLedger: Send + Sync {
    /// Persist a usage record
    fn record(&self, record: &UsageRecord) -> Result<(), CollaboratorError>;
}

/// Key-value store for finished responses
///
/// Implemented by the infrastructure layer (lectern-store). Each `set` must
/// replace the whole value atomically.
pub trait ResponseCache: Send + Sync {
    /// Look up a live (non-expired) entry
    fn get(&self, key: &str) -> Result<Option<String>, CollaboratorError>;

    /// Insert or replace an entry
    fn set(&self, key: &str, value: &str) -> Result<(), CollaboratorError>;

    /// Remove entries older than `age`, returning how many were removed
    fn evict_older_than(&self, age: Duration) -> Result<usize, CollaboratorError>;
}
