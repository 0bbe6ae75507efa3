//! Static per-model price table
//!
//! Prices are USD per one million tokens. Lookup is by longest matching
//! prefix so dated model names (`gpt-4o-mini-2024-07-18`) resolve to their
//! family row.

/// (model prefix, input USD / 1M, output USD / 1M)
const PRICES: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1-nano", 0.10, 0.40),
    ("gpt-4.1", 2.00, 8.00),
    ("o3-mini", 1.10, 4.40),
    ("claude-3-5-haiku", 0.80, 4.00),
    ("claude-sonnet", 3.00, 15.00),
    ("mock-model", 0.0, 0.0),
];

/// Applied when no prefix matches
const FALLBACK: (f64, f64) = (1.00, 3.00);

/// Input and output price for `model`
pub fn price_for(model: &str) -> (f64, f64) {
    let model = model.to_lowercase();
    let model = model.rsplit('/').next().unwrap_or(&model);
    PRICES
        .iter()
        .filter(|(prefix, _, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _, _)| prefix.len())
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or(FALLBACK)
}

/// Cost in USD of one call
pub fn cost_usd(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let (input, output) = price_for(model);
    (input * input_tokens as f64 + output * output_tokens as f64) / 1_000_000.0
}
