//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use lectern_janitor::SweepMetrics;
use lectern_pipeline::{SummaryResponse, SummaryStrategy};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a summarization result.
    pub fn format_summary(&self, response: &SummaryResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&response.json)?),
            OutputFormat::Table => Ok(self.format_summary_table(response)),
            OutputFormat::Quiet => Ok(response.document.summary.title.clone()),
        }
    }

    fn format_summary_table(&self, response: &SummaryResponse) -> String {
        let summary = &response.document.summary;
        if response.document.is_failure() {
            let reason = summary
                .sections
                .first()
                .map(|s| s.summary.as_str())
                .unwrap_or("unknown failure");
            return self.error(reason);
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Section", "Concepts", "Citations"]);
        for (i, section) in summary.sections.iter().enumerate() {
            builder.push_record([
                (i + 1).to_string(),
                section.heading.clone(),
                section.concepts.len().to_string(),
                section.citations.len().to_string(),
            ]);
        }
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![self.colorize(&summary.title, "cyan"), table.to_string()];
        lines.push(format!(
            "Strategy: {} | Domain: {} | Chunks: {} | Formulas: {} | Practice problems: {}",
            strategy_label(response.strategy),
            response.domain,
            response.chunk_count,
            summary.formula_sheet.len(),
            summary.practice_problems.len()
        ));
        if let Some(coverage) = response.coverage() {
            let line = format!("Coverage: {:.0}%", coverage.score * 100.0);
            lines.push(if coverage.score < 0.85 {
                self.warning(&line)
            } else {
                self.success(&line)
            });
            if !coverage.missing_topics.is_empty() {
                lines.push(format!("Missing topics: {}", coverage.missing_topics.join(", ")));
            }
        }
        if response.degraded_chunks > 0 {
            lines.push(self.warning(&format!(
                "{} chunk(s) could not be parsed and were summarized as raw text",
                response.degraded_chunks
            )));
        }
        if response.cache_hit {
            lines.push(self.info("Served from cache"));
        }
        lines.join("\n")
    }

    /// Format an eviction result.
    pub fn evicted(&self, count: usize, days: u64) -> String {
        self.success(&format!("Evicted {} cache entr{} older than {} day(s)", count, if count == 1 { "y" } else { "ies" }, days))
    }

    /// Format janitor metrics.
    pub fn sweep_metrics(&self, metrics: &SweepMetrics) -> String {
        match self.format {
            OutputFormat::Quiet => metrics.evicted.to_string(),
            _ => metrics.summary(),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().bold().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Human-readable strategy name.
pub fn strategy_label(strategy: SummaryStrategy) -> &'static str {
    match strategy {
        SummaryStrategy::SinglePass => "single pass",
        SummaryStrategy::TwoStage => "map-reduce (outline and fill)",
        SummaryStrategy::SingleStage => "map-reduce (merge)",
        SummaryStrategy::Topic => "topic",
        SummaryStrategy::Cached => "cached",
        SummaryStrategy::Failed => "failed",
    }
}
