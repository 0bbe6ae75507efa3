//! Metrics collected during Janitor operations

/// Metrics collected by cache sweeps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Cache entries evicted
    pub evicted: usize,

    /// Sweeps that failed
    pub failed_sweeps: usize,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful sweep
    pub fn record_sweep(&mut self, evicted: usize) {
        self.sweep_count += 1;
        self.evicted += evicted;
    }

    /// Record a failed sweep
    pub fn record_failure(&mut self) {
        self.sweep_count += 1;
        self.failed_sweeps += 1;
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Failed sweeps: {}", self.failed_sweeps),
            format!("Entries evicted: {}", self.evicted),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ]
        .join("\n")
    }
}

/// What the quality enforcer changed in one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupMetrics {
    /// Empty list entries dropped
    pub empty_entries_dropped: usize,

    /// Filler phrases stripped from examples
    pub filler_phrases_removed: usize,

    /// Examples cut down to the sentence cap
    pub examples_capped: usize,

    /// Template examples injected into concepts
    pub examples_injected: usize,

    /// Concepts given key points derived from their definition
    pub key_points_derived: usize,

    /// Formulas whose control flow moved to pseudocode
    pub formulas_split: usize,

    /// Near-duplicate sentences removed
    pub duplicate_sentences_removed: usize,

    /// Duplicate concepts removed
    pub duplicate_concepts_removed: usize,

    /// Duplicate glossary entries removed
    pub duplicate_glossary_removed: usize,

    /// Empty or duplicate citations dropped
    pub citations_dropped: usize,

    /// Citation evidence values truncated
    pub evidence_truncated: usize,

    /// Coverage fields clamped
    pub coverage_clamped: usize,
}

impl CleanupMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.empty_entries_dropped
            + self.filler_phrases_removed
            + self.examples_capped
            + self.examples_injected
            + self.key_points_derived
            + self.formulas_split
            + self.duplicate_sentences_removed
            + self.duplicate_concepts_removed
            + self.duplicate_glossary_removed
            + self.citations_dropped
            + self.evidence_truncated
            + self.coverage_clamped
    }

    /// Whether the enforcer left the document untouched
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Generate a summary report of the changes
    pub fn summary(&self) -> String {
        let rows = [
            ("Empty entries dropped", self.empty_entries_dropped),
            ("Filler phrases removed", self.filler_phrases_removed),
            ("Examples capped", self.examples_capped),
            ("Examples injected", self.examples_injected),
            ("Key points derived", self.key_points_derived),
            ("Formulas split", self.formulas_split),
            ("Duplicate sentences removed", self.duplicate_sentences_removed),
            ("Duplicate concepts removed", self.duplicate_concepts_removed),
            ("Duplicate glossary entries removed", self.duplicate_glossary_removed),
            ("Citations dropped", self.citations_dropped),
            ("Evidence truncated", self.evidence_truncated),
            ("Coverage clamped", self.coverage_clamped),
        ];

        let mut lines = vec!["Cleanup Summary".to_string(), "===============".to_string()];
        lines.extend(
            rows.iter()
                .filter(|(_, n)| *n > 0)
                .map(|(label, n)| format!("{}: {}", label, n)),
        );
        lines.push(format!("Total changes: {}", self.total()));
        lines.join("\n")
    }
}
