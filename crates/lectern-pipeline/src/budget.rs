//! Token budgets sized to content
//!
//! MAP calls get a budget that grows with formula and proof density. The
//! single-stage merge fallback spreads its budget across extracted items.

use crate::config::BudgetConfig;
use serde::{Deserialize, Serialize};

const FORMULA_SIGNALS: &[&str] = &["=", "∫", "∑", "equation", "calculate", "formula"];
const PROOF_SIGNALS: &[&str] = &["theorem", "proof", "algorithm", "lemma"];

/// Whether the text carries formula-like notation or vocabulary
pub fn has_formula_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    FORMULA_SIGNALS.iter().any(|s| lower.contains(s))
}

/// Whether the text talks about proofs or algorithms
pub fn has_proof_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    PROOF_SIGNALS.iter().any(|s| lower.contains(s))
}

/// MAP output budget for one chunk
///
/// Starts at the base budget, adds a boost per signal family present, and
/// never exceeds the configured maximum.
///
/// # Examples
///
/// ```
/// use lectern_pipeline::budget::chunk_budget;
/// use lectern_pipeline::BudgetConfig;
///
/// let config = BudgetConfig::default();
/// assert_eq!(chunk_budget("plain prose", &config), 1_800);
/// assert_eq!(chunk_budget("Theorem: E = mc^2", &config), 3_000);
/// ```
pub fn chunk_budget(text: &str, config: &BudgetConfig) -> u32 {
    let mut budget = config.base_tokens;
    if has_formula_signal(text) {
        budget = budget.saturating_add(config.formula_boost);
    }
    if has_proof_signal(text) {
        budget = budget.saturating_add(config.proof_boost);
    }
    budget.min(config.max_tokens)
}

/// Number of extracted items per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemCounts {
    /// Concepts
    pub concepts: usize,
    /// Formulas
    pub formulas: usize,
    /// Theorems
    pub theorems: usize,
}

impl ItemCounts {
    /// Build from a `(concepts, formulas, theorems)` tuple
    pub fn from_tuple((concepts, formulas, theorems): (usize, usize, usize)) -> Self {
        Self {
            concepts,
            formulas,
            theorems,
        }
    }

    /// Total items
    pub fn total(&self) -> usize {
        self.concepts + self.formulas + self.theorems
    }
}

/// Per-item token allocation for the merge call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeBudget {
    /// Tokens per concept
    pub per_concept: u32,
    /// Tokens per formula
    pub per_formula: u32,
    /// Tokens per theorem
    pub per_theorem: u32,
}

impl MergeBudget {
    /// Tokens allocated across all items
    pub fn allocated(&self, counts: &ItemCounts) -> u64 {
        self.per_concept as u64 * counts.concepts as u64
            + self.per_formula as u64 * counts.formulas as u64
            + self.per_theorem as u64 * counts.theorems as u64
    }
}

/// Allocate `max_budget` across items, respecting per-category floors
///
/// When the floors alone overshoot the budget every allocation is scaled down
/// uniformly. Otherwise the surplus is spread evenly over all items. Both
/// branches round down, so the allocation never exceeds `max_budget`.
pub fn distribute_merge_budget(counts: ItemCounts, max_budget: u32, config: &BudgetConfig) -> MergeBudget {
    let floors = [config.concept_floor, config.formula_floor, config.theorem_floor];
    let floor_sum = floors[0] as u64 * counts.concepts as u64
        + floors[1] as u64 * counts.formulas as u64
        + floors[2] as u64 * counts.theorems as u64;
    let max = max_budget as u64;

    let [per_concept, per_formula, per_theorem] = if floor_sum == 0 {
        floors
    } else if floor_sum > max {
        floors.map(|f| (f as u64 * max / floor_sum) as u32)
    } else {
        let extra = ((max - floor_sum) / counts.total() as u64) as u32;
        floors.map(|f| f.saturating_add(extra))
    };

    MergeBudget {
        per_concept,
        per_formula,
        per_theorem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boosts_are_capped() {
        let config = BudgetConfig {
            max_tokens: 2_500,
            ..BudgetConfig::default()
        };
        assert_eq!(chunk_budget("A lemma and an equation", &config), 2_500);
    }

    #[test]
    fn test_signals_are_case_insensitive() {
        assert!(has_formula_signal("CALCULATE the rate"));
        assert!(has_proof_signal("Proof by induction"));
        assert!(!has_formula_signal("no symbols here"));
    }

    #[test]
    fn test_surplus_spread_evenly() {
        let counts = ItemCounts::from_tuple((2, 1, 1));
        let budget = distribute_merge_budget(counts, 1_000, &BudgetConfig::default());
        // floors 240 + 160 + 200 = 600; surplus 400 over 4 items
        assert_eq!(budget.per_concept, 220);
        assert_eq!(budget.per_formula, 260);
        assert_eq!(budget.per_theorem, 300);
        assert_eq!(budget.allocated(&counts), 1_000);
    }

    #[test]
    fn test_floors_scaled_when_over_budget() {
        let counts = ItemCounts::from_tuple((10, 0, 0));
        let budget = distribute_merge_budget(counts, 600, &BudgetConfig::default());
        assert_eq!(budget.per_concept, 60);
        assert!(budget.allocated(&counts) <= 600);
    }

    #[test]
    fn test_no_items_keeps_floors() {
        let budget = distribute_merge_budget(ItemCounts::default(), 500, &BudgetConfig::default());
        assert_eq!(budget.per_concept, 120);
        assert_eq!(budget.allocated(&ItemCounts::default()), 0);
    }

    proptest! {
        #[test]
        fn prop_budget_never_exceeds_cap(text in ".{0,300}") {
            let config = BudgetConfig::default();
            prop_assert!(chunk_budget(&text, &config) <= config.max_tokens);
        }

        #[test]
        fn prop_signals_raise_budget(plain in "[bcd ]{0,200}") {
            let config = BudgetConfig::default();
            let signalled = format!("{} theorem x = y", plain);
            prop_assert!(chunk_budget(&signalled, &config) > chunk_budget(&plain, &config));
        }

        #[test]
        fn prop_merge_allocation_within_budget(
            concepts in 0usize..200,
            formulas in 0usize..200,
            theorems in 0usize..200,
            max_budget in 0u32..100_000,
        ) {
            let counts = ItemCounts { concepts, formulas, theorems };
            let budget = distribute_merge_budget(counts, max_budget, &BudgetConfig::default());
            prop_assert!(budget.allocated(&counts) <= max_budget as u64);
        }
    }
}
