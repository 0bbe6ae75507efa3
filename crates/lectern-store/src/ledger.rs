//! Token-usage ledgers

use crate::{lock, open, open_in_memory, StoreError};
use lectern_domain::{CollaboratorError, UsageLedger, UsageRecord};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Aggregate usage for one user (or everyone)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageSummary {
    /// Number of recorded calls
    pub calls: u64,
    /// Sum of total tokens
    pub total_tokens: u64,
    /// Sum of cost in USD
    pub cost: f64,
}

/// SQLite-backed usage ledger
///
/// Writes one row per record into the `token_usage` table.
pub struct SqliteUsageLedger {
    conn: Mutex<Connection>,
}

impl SqliteUsageLedger {
    /// Open (or create) the ledger at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open(path.as_ref())?),
        })
    }

    /// Ledger in a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_in_memory()?),
        })
    }

    /// Insert a record
    pub fn insert(&self, record: &UsageRecord) -> Result<(), StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO token_usage (request_id, user_id, endpoint, model, input_tokens, output_tokens, total_tokens, cost, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.request_id.map(|id| id.to_string()),
                record.user_id,
                record.endpoint,
                record.model,
                record.input_tokens,
                record.output_tokens,
                record.total_tokens,
                record.cost,
                record.recorded_at as i64,
            ],
        )?;
        debug!("Recorded {} tokens for {}", record.total_tokens, record.endpoint);
        Ok(())
    }

    /// Totals for `user_id`, or for all rows when `None`
    pub fn summary(&self, user_id: Option<&str>) -> Result<UsageSummary, StoreError> {
        let conn = lock(&self.conn)?;
        let row = |row: &rusqlite::Row<'_>| {
            Ok(UsageSummary {
                calls: row.get::<_, i64>(0)? as u64,
                total_tokens: row.get::<_, i64>(1)? as u64,
                cost: row.get(2)?,
            })
        };
        let summary = match user_id {
            Some(user) => conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(total_tokens), 0), COALESCE(SUM(cost), 0.0)
                 FROM token_usage WHERE user_id = ?1",
                params![user],
                row,
            )?,
            None => conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(total_tokens), 0), COALESCE(SUM(cost), 0.0) FROM token_usage",
                [],
                row,
            )?,
        };
        Ok(summary)
    }

    /// Calls recorded for `user_id` at or after `since` (Unix seconds)
    pub fn calls_since(&self, user_id: &str, since: u64) -> Result<u64, StoreError> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM token_usage WHERE user_id = ?1 AND recorded_at >= ?2",
            params![user_id, since as i64],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl UsageLedger for SqliteUsageLedger {
    fn record(&self, record: &UsageRecord) -> Result<(), CollaboratorError> {
        self.insert(record).map_err(CollaboratorError::from)
    }
}

/// Ledger that keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryUsageLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemoryUsageLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Totals over all records
    pub fn summary(&self) -> UsageSummary {
        self.records().iter().fold(UsageSummary::default(), |mut acc, r| {
            acc.calls += 1;
            acc.total_tokens += r.total_tokens as u64;
            acc.cost += r.cost;
            acc
        })
    }
}

impl UsageLedger for MemoryUsageLedger {
    fn record(&self, record: &UsageRecord) -> Result<(), CollaboratorError> {
        self.records
            .lock()
            .map_err(|_| CollaboratorError::Storage("ledger lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ledger_summary() {
        let ledger = MemoryUsageLedger::new();
        ledger.record(&UsageRecord::new("map", "m", 10, 5, 0.5)).unwrap();
        ledger.record(&UsageRecord::new("reduce.fill", "m", 20, 10, 1.0)).unwrap();

        let summary = ledger.summary();
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.total_tokens, 45);
        assert!((summary.cost - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_sqlite_summary_empty() {
        let ledger = SqliteUsageLedger::in_memory().unwrap();
        assert_eq!(ledger.summary(None).unwrap(), UsageSummary::default());
    }
}
