//! Cache maintenance commands.

use super::database_path;
use crate::cli::{EvictCacheArgs, JanitorArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use lectern_domain::ResponseCache;
use lectern_janitor::JanitorWorker;
use lectern_store::SqliteResponseCache;
use std::sync::Arc;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Execute the evict-cache command.
pub async fn execute_evict_cache(args: EvictCacheArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let cache = SqliteResponseCache::new(database_path(config)?)?;
    let evicted = evict(&cache, args.days)?;
    println!("{}", formatter.evicted(evicted, args.days));
    Ok(())
}

fn evict(cache: &SqliteResponseCache, days: u64) -> Result<usize> {
    Ok(cache.evict(Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)))?)
}

/// Execute the janitor command.
pub async fn execute_janitor(args: JanitorArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let cache: Arc<dyn ResponseCache> = Arc::new(SqliteResponseCache::new(database_path(config)?)?);
    let mut worker = JanitorWorker::new(config.janitor.clone(), cache);
    if let Some(minutes) = args.interval_minutes {
        worker = worker.with_interval(Duration::from_secs(minutes.max(1) * 60));
    }

    println!("{}", formatter.info("Cache janitor started (Ctrl-C to stop)"));
    match args.cycles {
        Some(cycles) => worker.run_cycles(cycles).await?,
        None => worker.run().await?,
    }
    println!("{}", formatter.sweep_metrics(worker.metrics()));
    Ok(())
}
