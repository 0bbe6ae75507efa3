//! Response caches
//!
//! Both implementations store whole values: a `set` replaces the entry in one
//! step, so concurrent writers for the same key resolve to the last writer.

use crate::{lock, open, open_in_memory, StoreError};
use lectern_domain::usage::unix_now;
use lectern_domain::{CollaboratorError, ResponseCache};
use moka::sync::Cache;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Default entry lifetime (7 days)
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn is_live(created_at: u64, now: u64, ttl: Duration) -> bool {
    now.saturating_sub(created_at) < ttl.as_secs()
}

/// SQLite-backed response cache
pub struct SqliteResponseCache {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteResponseCache {
    /// Open (or create) the cache at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open(path.as_ref())?),
            ttl: DEFAULT_TTL,
        })
    }

    /// Cache in a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_in_memory()?),
            ttl: DEFAULT_TTL,
        })
    }

    /// Override the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Insert or replace an entry with an explicit creation time
    pub fn put_at(&self, key: &str, value: &str, created_at: u64) -> Result<(), StoreError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO response_cache (cache_key, value, created_at) VALUES (?1, ?2, ?3)",
            params![key, value, created_at as i64],
        )?;
        Ok(())
    }

    /// Look up a live entry
    pub fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = lock(&self.conn)?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, created_at FROM response_cache WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(value, created_at)| {
            if is_live(created_at.max(0) as u64, unix_now(), self.ttl) {
                Some(value)
            } else {
                debug!("Cache entry {} expired", key);
                None
            }
        }))
    }

    /// Delete entries older than `age`
    pub fn evict(&self, age: Duration) -> Result<usize, StoreError> {
        let cutoff = unix_now().saturating_sub(age.as_secs());
        let conn = lock(&self.conn)?;
        let removed = conn.execute(
            "DELETE FROM response_cache WHERE created_at <= ?1",
            params![cutoff as i64],
        )?;
        if removed > 0 {
            info!("Evicted {} cache entries", removed);
        }
        Ok(removed)
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> Result<usize, StoreError> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM response_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl ResponseCache for SqliteResponseCache {
    fn get(&self, key: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(self.fetch(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CollaboratorError> {
        Ok(self.put_at(key, value, unix_now())?)
    }

    fn evict_older_than(&self, age: Duration) -> Result<usize, CollaboratorError> {
        Ok(self.evict(age)?)
    }
}

/// In-memory response cache backed by moka
#[derive(Clone)]
pub struct MemoryResponseCache {
    entries: Cache<String, (u64, Arc<str>)>,
    ttl: Duration,
}

impl MemoryResponseCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Insert with an explicit creation time
    pub fn put_at(&self, key: &str, value: &str, created_at: u64) {
        self.entries
            .insert(key.to_string(), (created_at, Arc::from(value)));
    }

    /// Number of entries, after pending maintenance
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, key: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(self
            .entries
            .get(key)
            .filter(|(created_at, _)| is_live(*created_at, unix_now(), self.ttl))
            .map(|(_, value)| value.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CollaboratorError> {
        self.put_at(key, value, unix_now());
        Ok(())
    }

    fn evict_older_than(&self, age: Duration) -> Result<usize, CollaboratorError> {
        let cutoff = unix_now().saturating_sub(age.as_secs());
        let stale: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(_, (created_at, _))| *created_at <= cutoff)
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            self.entries.invalidate(key.as_str());
        }
        self.entries.run_pending_tasks();
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_boundary() {
        let ttl = Duration::from_secs(10);
        assert!(is_live(100, 109, ttl));
        assert!(!is_live(100, 110, ttl));
        assert!(!is_live(100, 100, Duration::ZERO));
    }

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemoryResponseCache::new(10);
        cache.set("k", "v").unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn test_memory_cache_expired_entry_invisible() {
        let cache = MemoryResponseCache::new(10).with_ttl(Duration::from_secs(60));
        cache.put_at("old", "v", unix_now() - 3_600);
        assert_eq!(cache.get("old").unwrap(), None);
    }

    #[test]
    fn test_memory_cache_evicts_old_entries_only() {
        let cache = MemoryResponseCache::new(10);
        cache.put_at("old", "v", unix_now() - 10 * 24 * 3_600);
        cache.set("fresh", "v").unwrap();

        let removed = cache.evict_older_than(DEFAULT_TTL).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.get("fresh").unwrap().as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sqlite_last_writer_wins() {
        let cache = SqliteResponseCache::in_memory().unwrap();
        cache.set("k", "first").unwrap();
        cache.set("k", "second").unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len().unwrap(), 1);
    }
}
