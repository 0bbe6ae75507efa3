//! Topic coverage of generated documents against their source

use crate::config::CoverageConfig;
use lectern_domain::{Coverage, FinalDocument};
use regex::Regex;
use similar::TextDiff;
use std::sync::LazyLock;
use tracing::debug;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*$").expect("hardcoded regex pattern is valid"));

static NUMBERED_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)*\.?\s+(\p{Lu}.{1,80})$").expect("hardcoded regex pattern is valid")
});

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]{3,80})\*\*").expect("hardcoded regex pattern is valid"));

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:={3,}|-{3,})\s*$").expect("hardcoded regex pattern is valid"));

static COLON_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\p{Lu}[^:]{2,60}):$").expect("hardcoded regex pattern is valid"));

static LEADING_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d+)*\.?|[ivxIVX]+\.)\s+").expect("hardcoded regex pattern is valid"));

fn is_all_caps_line(line: &str) -> bool {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    line.chars().count() < 80
        && letters.len() >= 3
        && letters.iter().all(|c| c.is_uppercase())
        && line.split_whitespace().count() >= 2
}

/// Normalize a topic for comparison: lowercase, no numbering, collapsed whitespace
pub fn normalize_topic(topic: &str) -> String {
    let trimmed = topic.trim().trim_start_matches('#').trim();
    let without_numbering = LEADING_NUMBERING.replace(trimmed, "");
    without_numbering
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '(' && c != ')')
        .to_lowercase()
}

fn clean_display(topic: &str) -> String {
    let trimmed = topic.trim().trim_start_matches('#').trim();
    let without_numbering = LEADING_NUMBERING.replace(trimmed, "");
    without_numbering
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract source topics with six structural heuristics
///
/// Topics come back in document order, deduplicated on their normalized form
/// and capped at `max_topics`.
pub fn extract_source_topics(text: &str, max_topics: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut topics: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let mut push = |candidate: &str| {
        let display = clean_display(candidate);
        let key = normalize_topic(&display);
        if key.chars().count() < 3 || seen.contains(&key) {
            return;
        }
        seen.push(key);
        topics.push(display);
    };

    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = MARKDOWN_HEADING.captures(line) {
            push(&caps[1]);
        } else if let Some(caps) = NUMBERED_SECTION.captures(line) {
            push(&caps[1]);
        } else if is_all_caps_line(line) {
            push(line);
        } else if lines
            .get(idx + 1)
            .is_some_and(|next| SETEXT_UNDERLINE.is_match(next.trim()))
            && line.chars().count() < 100
        {
            push(line);
        } else if let Some(caps) = COLON_LINE.captures(line) {
            push(&caps[1]);
        }

        for caps in BOLD_SPAN.captures_iter(line) {
            push(&caps[1]);
        }
    }

    topics.truncate(max_topics);
    topics
}

/// Topics the generated document claims to cover
///
/// Section headings, concept terms, formula names and glossary terms.
pub fn extract_generated_topics(doc: &FinalDocument) -> Vec<String> {
    let summary = &doc.summary;
    let mut topics: Vec<String> = Vec::new();
    for section in &summary.sections {
        topics.push(section.heading.clone());
        topics.extend(section.concepts.iter().map(|c| c.term.clone()));
    }
    topics.extend(summary.formula_sheet.iter().map(|f| f.name.clone()));
    topics.extend(summary.glossary.iter().map(|g| g.term.clone()));
    topics.retain(|t| !t.trim().is_empty());
    topics
}

/// Similarity in [0, 1]: the character-level match ratio of the normalized topics
///
/// Twice the matched characters over the combined length, so identical
/// topics score 1.0 and disjoint ones 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_topic(a);
    let b = normalize_topic(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

/// Score how many source topics the generated topics match
///
/// A source topic matches when its best similarity reaches `threshold`.
/// Zero source topics means full coverage.
pub fn measure(source_topics: &[String], generated_topics: &[String], threshold: f64, max_missing: usize) -> Coverage {
    if source_topics.is_empty() {
        return Coverage {
            score: 1.0,
            missing_topics: Vec::new(),
        };
    }

    let mut matched = 0usize;
    let mut missing = Vec::new();
    for topic in source_topics {
        let best = generated_topics
            .iter()
            .map(|g| similarity(topic, g))
            .fold(0.0_f64, f64::max);
        if best >= threshold {
            matched += 1;
        } else {
            missing.push(topic.clone());
        }
    }

    missing.truncate(max_missing);
    Coverage {
        score: matched as f64 / source_topics.len() as f64,
        missing_topics: missing,
    }
}

/// Measures coverage and decides whether a regeneration is warranted
#[derive(Debug, Clone, Default)]
pub struct CoverageValidator {
    config: CoverageConfig,
}

impl CoverageValidator {
    /// Create a validator with the given configuration
    pub fn new(config: CoverageConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Source topics of `text`, capped per configuration
    pub fn source_topics(&self, text: &str) -> Vec<String> {
        extract_source_topics(text, self.config.max_source_topics)
    }

    /// Coverage of `doc` against precomputed source topics
    pub fn measure(&self, source_topics: &[String], doc: &FinalDocument) -> Coverage {
        let generated = extract_generated_topics(doc);
        let coverage = measure(
            source_topics,
            &generated,
            self.config.similarity_threshold,
            self.config.max_missing_topics,
        );
        debug!(
            "Coverage {:.2} over {} source topics ({} generated)",
            coverage.score,
            source_topics.len(),
            generated.len()
        );
        coverage
    }

    /// Whether the score is below the regeneration threshold
    pub fn needs_regeneration(&self, coverage: &Coverage) -> bool {
        coverage.score < self.config.coverage_threshold
    }

    /// Missing topics to inject into the regeneration instructions
    pub fn hint_topics(&self, coverage: &Coverage) -> Vec<String> {
        coverage
            .missing_topics
            .iter()
            .take(self.config.max_hint_topics)
            .cloned()
            .collect()
    }
}
