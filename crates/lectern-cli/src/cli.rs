//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lectern - Turn documents into structured study guides.
#[derive(Debug, Parser)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Section table with statistics (default)
    Table,
    /// Rendered document JSON
    Json,
    /// Title only
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize a document into a study guide
    Summarize(SummarizeArgs),

    /// Write a study guide from a topic alone
    Topic(TopicArgs),

    /// Evict cached responses older than a number of days
    EvictCache(EvictCacheArgs),

    /// Run the cache janitor in the foreground
    Janitor(JanitorArgs),
}

/// Arguments for the summarize command.
#[derive(Debug, Parser)]
pub struct SummarizeArgs {
    /// Text file to summarize ("-" reads stdin)
    pub file: PathBuf,

    /// Output language
    #[arg(short, long, default_value = "English")]
    pub language: String,

    /// Extra instructions for the model
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// Plan whose limits apply (free, basic, premium)
    #[arg(short, long)]
    pub plan: Option<String>,

    /// Requested output cap in tokens (defaults to the plan maximum)
    #[arg(long)]
    pub output_cap: Option<u32>,

    /// Use map-reduce even for small inputs
    #[arg(long)]
    pub force_chunking: bool,

    /// Write the document JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the topic command.
#[derive(Debug, Parser)]
pub struct TopicArgs {
    /// Topic to write about
    pub topic: String,

    /// Output language
    #[arg(short, long, default_value = "English")]
    pub language: String,

    /// Plan whose limits apply (free, basic, premium)
    #[arg(short, long)]
    pub plan: Option<String>,

    /// Requested output cap in tokens (defaults to the plan maximum)
    #[arg(long)]
    pub output_cap: Option<u32>,

    /// Write the document JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the evict-cache command.
#[derive(Debug, Parser)]
pub struct EvictCacheArgs {
    /// Evict entries older than this many days
    #[arg(short, long, default_value = "7")]
    pub days: u64,
}

/// Arguments for the janitor command.
#[derive(Debug, Parser)]
pub struct JanitorArgs {
    /// Stop after this many sweeps (runs until Ctrl-C otherwise)
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Minutes between sweeps (overrides the configuration)
    #[arg(long)]
    pub interval_minutes: Option<u64>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_command() {
        let cli = Cli::parse_from([
            "lectern",
            "summarize",
            "notes.txt",
            "--language",
            "German",
            "--plan",
            "basic",
            "--force-chunking",
        ]);
        match cli.command {
            Command::Summarize(args) => {
                assert_eq!(args.file, PathBuf::from("notes.txt"));
                assert_eq!(args.language, "German");
                assert_eq!(args.plan.as_deref(), Some("basic"));
                assert!(args.force_chunking);
                assert!(args.output.is_none());
            }
            _ => panic!("Expected Summarize command"),
        }
    }

    #[test]
    fn test_evict_cache_default_days() {
        let cli = Cli::parse_from(["lectern", "evict-cache"]);
        match cli.command {
            Command::EvictCache(args) => assert_eq!(args.days, 7),
            _ => panic!("Expected EvictCache command"),
        }
    }

    #[test]
    fn test_janitor_cycles() {
        let cli = Cli::parse_from(["lectern", "--format", "json", "janitor", "--cycles", "3"]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Command::Janitor(args) => assert_eq!(args.cycles, Some(3)),
            _ => panic!("Expected Janitor command"),
        }
    }

    #[test]
    fn test_topic_requires_topic() {
        assert!(Cli::try_parse_from(["lectern", "topic"]).is_err());
    }
}
