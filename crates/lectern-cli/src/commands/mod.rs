//! Command implementations.

pub mod cache;
pub mod summarize;
pub mod topic;

pub use self::cache::{execute_evict_cache, execute_janitor};
pub use self::summarize::execute_summarize;
pub use self::topic::execute_topic;

use crate::config::Config;
use crate::error::{CliError, Result};
use lectern_domain::PlanLimits;
use lectern_llm::{LlmGateway, OpenAiBackend};
use lectern_pipeline::{Summarizer, SummaryResponse};
use lectern_store::{SqliteResponseCache, SqliteUsageLedger};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolve the database path, creating its directory when needed.
pub(crate) fn database_path(config: &Config) -> Result<PathBuf> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

/// Build a summarizer wired to the configured backend, ledger and cache.
pub(crate) fn build_summarizer(config: &Config, plan: Option<&str>) -> Result<Summarizer> {
    let mut backend = OpenAiBackend::new(&config.llm.endpoint, &config.llm.model)?
        .with_json_mode(config.llm.json_mode);
    match config.api_key() {
        Some(key) => backend = backend.with_api_key(key),
        None => warn!(env = %config.llm.api_key_env, "no API key set, sending unauthenticated requests"),
    }

    let db = database_path(config)?;
    let ledger = SqliteUsageLedger::new(&db)?;
    let cache = SqliteResponseCache::new(&db)?.with_ttl(config.janitor.cache_ttl());
    debug!(path = %db.display(), "opened store");

    let mut pipeline = config.pipeline.clone();
    pipeline.plan = PlanLimits::for_plan(plan.unwrap_or(&config.plan));

    let gateway = LlmGateway::new(Arc::new(backend)).with_ledger(Arc::new(ledger));
    Ok(Summarizer::new(gateway, pipeline)?.with_cache(Arc::new(cache)))
}

/// Write the document JSON to `path`, when given.
pub(crate) fn write_output(response: &SummaryResponse, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, response.to_json_pretty())?;
    }
    Ok(())
}

/// Turn a failed run into an error after printing it.
pub(crate) fn ensure_success(response: &SummaryResponse) -> Result<()> {
    if response.document.is_failure() {
        return Err(CliError::InvalidInput("summarization produced no study guide".to_string()));
    }
    Ok(())
}
