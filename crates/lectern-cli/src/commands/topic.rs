//! Topic command implementation.

use super::{build_summarizer, ensure_success, write_output};
use crate::cli::TopicArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;

/// Execute the topic command.
pub async fn execute_topic(args: TopicArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let topic = args.topic.trim();
    if topic.is_empty() {
        return Err(CliError::InvalidInput("topic is empty".to_string()));
    }

    let summarizer = build_summarizer(config, args.plan.as_deref())?;
    let response = summarizer
        .summarize_without_source(topic, &args.language, args.output_cap.unwrap_or(0))
        .await;

    write_output(&response, args.output.as_deref())?;
    println!("{}", formatter.format_summary(&response)?);
    ensure_success(&response)
}
