//! Lectern Storage Layer
//!
//! Implements the `UsageLedger` and `ResponseCache` traits from
//! `lectern-domain`.
//!
//! # Architecture
//!
//! - SQLite for the token-usage ledger (one fixed table, plain inserts)
//! - SQLite or moka for the response cache (whole-value, last writer wins)
//! - In-memory ledger for tests and one-off CLI runs
//!
//! # Examples
//!
//! ```no_run
//! use lectern_store::{SqliteResponseCache, SqliteUsageLedger};
//!
//! let ledger = SqliteUsageLedger::new("lectern.db").unwrap();
//! let cache = SqliteResponseCache::new("lectern.db").unwrap();
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod ledger;

use lectern_domain::CollaboratorError;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

pub use cache::{MemoryResponseCache, SqliteResponseCache, DEFAULT_TTL};
pub use ledger::{MemoryUsageLedger, SqliteUsageLedger, UsageSummary};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A lock holder panicked
    #[error("Lock poisoned")]
    Poisoned,
}

impl From<StoreError> for CollaboratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidData(msg) => CollaboratorError::Serialization(msg),
            other => CollaboratorError::Storage(other.to_string()),
        }
    }
}

/// Open a connection and apply the schema
pub(crate) fn open(path: &std::path::Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(conn)
}

/// In-memory connection with the schema applied
pub(crate) fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(conn)
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock().map_err(|_| StoreError::Poisoned)
}
