//! Summarize command implementation.

use super::{build_summarizer, ensure_success, write_output};
use crate::cli::SummarizeArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use lectern_pipeline::SummarizeRequest;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::info;

/// Execute the summarize command.
pub async fn execute_summarize(args: SummarizeArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let text = read_input(&args.file)?;
    if text.trim().is_empty() {
        return Err(CliError::InvalidInput("input is empty".to_string()));
    }

    let summarizer = build_summarizer(config, args.plan.as_deref())?;
    let mut request = SummarizeRequest::new(text)
        .with_language(args.language)
        .with_force_chunking(args.force_chunking);
    if let Some(instructions) = args.instructions {
        request = request.with_instructions(instructions);
    }
    if let Some(cap) = args.output_cap {
        request = request.with_output_cap(cap);
    }

    info!(file = %args.file.display(), "summarizing");
    let response = summarizer.summarize(request).await;

    write_output(&response, args.output.as_deref())?;
    println!("{}", formatter.format_summary(&response)?);
    if let Some(path) = &args.output {
        println!("{}", formatter.info(&format!("Wrote {}", path.display())));
    }
    ensure_success(&response)
}

/// Read the document from a file, or stdin for "-".
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    Ok(fs::read_to_string(path)?)
}
