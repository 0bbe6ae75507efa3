//! Background worker for continuous Janitor operation

use crate::{CacheJanitor, JanitorConfig, JanitorError, SweepMetrics};
use lectern_domain::ResponseCache;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Background worker that runs cache sweeps on a schedule
///
/// # Examples
///
/// ```no_run
/// use lectern_janitor::{JanitorWorker, JanitorConfig};
/// use lectern_store::SqliteResponseCache;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = Arc::new(SqliteResponseCache::new("lectern.db")?);
///     let mut worker = JanitorWorker::new(JanitorConfig::default(), cache);
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run().await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: CacheJanitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: JanitorConfig, cache: Arc<dyn ResponseCache>) -> Self {
        let interval = config.sweep_interval();
        Self {
            janitor: CacheJanitor::new(config, cache),
            interval,
        }
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn check_interval(&self) -> Result<(), JanitorError> {
        if self.interval.is_zero() {
            return Err(JanitorError::Worker("sweep interval must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Run the worker indefinitely
    ///
    /// Sweeps at the configured interval until a shutdown signal (Ctrl+C)
    /// is received. A failed sweep is logged and the worker keeps going.
    pub async fn run(&mut self) -> Result<(), JanitorError> {
        self.check_interval()?;
        let mut ticker = interval(self.interval);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting sweep cycle");

                    match self.janitor.sweep() {
                        Ok(evicted) => {
                            tracing::info!("Sweep completed: {} evicted", evicted);
                        }
                        Err(e) => {
                            tracing::error!("Sweep failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!("Janitor stopped. Final metrics:\n{}", self.janitor.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles
    ///
    /// Stops at the first failed sweep.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<(), JanitorError> {
        self.check_interval()?;
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);

            match self.janitor.sweep() {
                Ok(evicted) => {
                    tracing::info!("Sweep {}/{} completed: {} evicted", cycle + 1, cycles, evicted);
                }
                Err(e) => {
                    tracing::error!("Sweep {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            self.janitor.metrics().summary()
        );

        Ok(())
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &SweepMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}
