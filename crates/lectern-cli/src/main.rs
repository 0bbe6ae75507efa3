//! Lectern CLI - Turn documents into structured study guides.

use clap::Parser;
use lectern_cli::commands;
use lectern_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,lectern_cli=info,lectern_pipeline=info,lectern_janitor=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Determine output format
    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let result = match cli.command {
        Command::Summarize(args) => commands::execute_summarize(args, &config, &formatter).await,
        Command::Topic(args) => commands::execute_topic(args, &config, &formatter).await,
        Command::EvictCache(args) => commands::execute_evict_cache(args, &config, &formatter).await,
        Command::Janitor(args) => commands::execute_janitor(args, &config, &formatter).await,
    };

    if let Err(e) = result {
        eprintln!("{}", formatter.error(&e.to_string()));
        std::process::exit(1);
    }

    Ok(())
}
