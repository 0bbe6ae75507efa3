//! Core Janitor implementation for response-cache eviction

use crate::{JanitorConfig, JanitorError, SweepMetrics};
use lectern_domain::ResponseCache;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Janitor service for cache eviction
///
/// Each sweep removes cached responses older than the configured TTL.
///
/// # Examples
///
/// ```
/// use lectern_janitor::{CacheJanitor, JanitorConfig};
/// use lectern_store::MemoryResponseCache;
/// use std::sync::Arc;
///
/// let cache = Arc::new(MemoryResponseCache::default());
/// let mut janitor = CacheJanitor::new(JanitorConfig::default(), cache);
/// let evicted = janitor.sweep().unwrap();
/// assert_eq!(evicted, 0);
/// println!("{}", janitor.metrics().summary());
/// ```
pub struct CacheJanitor {
    config: JanitorConfig,
    cache: Arc<dyn ResponseCache>,
    metrics: SweepMetrics,
}

impl CacheJanitor {
    /// Create a new Janitor with the given configuration
    pub fn new(config: JanitorConfig, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            config,
            cache,
            metrics: SweepMetrics::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Perform one sweep, returning the number of evicted entries
    pub fn sweep(&mut self) -> Result<usize, JanitorError> {
        let start = Instant::now();
        let result = self.cache.evict_older_than(self.config.cache_ttl());
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        match result {
            Ok(evicted) => {
                debug!("Sweep evicted {} entries", evicted);
                self.metrics.record_sweep(evicted);
                Ok(evicted)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e.into())
            }
        }
    }
}
