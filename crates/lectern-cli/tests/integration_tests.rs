//! Integration tests for lectern-cli
//!
//! Exercise configuration files and argument parsing the way the binary uses them.

use clap::Parser;
use lectern_cli::config::OutputFormat;
use lectern_cli::{Cli, Command, Config};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_file_overrides_pipeline_and_janitor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let db = dir.path().join("guides.db");
    fs::write(
        &path,
        format!(
            "plan = \"premium\"\ndatabase_path = {:?}\n\n[settings]\nformat = \"json\"\ncolor = false\n\n[janitor]\ncache_ttl_days = 3\n\n[pipeline]\nsingle_pass_max_tokens = 2000\n",
            db.to_string_lossy()
        ),
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.plan, "premium");
    assert_eq!(config.database_path().unwrap(), db);
    assert_eq!(config.settings.format, OutputFormat::Json);
    assert!(!config.settings.color);
    assert_eq!(config.janitor.cache_ttl_days, 3);
    assert_eq!(config.pipeline.single_pass_max_tokens, 2_000);
}

#[test]
fn test_malformed_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "plan = [unterminated").unwrap();

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_config_flag_and_stdin_input() {
    let cli = Cli::parse_from(["lectern", "--config", "/tmp/lectern.toml", "summarize", "-", "--output", "guide.json"]);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/lectern.toml")));
    match cli.command {
        Command::Summarize(args) => {
            assert_eq!(args.file.as_os_str(), "-");
            assert_eq!(args.output.as_deref(), Some(std::path::Path::new("guide.json")));
            assert_eq!(args.language, "English");
        }
        _ => panic!("Expected Summarize command"),
    }
}
