use crate::types::Usage;

/// (model prefix, USD per 1M input tokens, USD per 1M output tokens)
const RATES: &[(&str, f64, f64)] = &[
    ("claude-opus-4", 15.0, 75.0),
    ("claude-sonnet-4", 3.0, 15.0),
    ("claude-haiku-4", 1.0, 5.0),
    ("claude-haiku-3", 0.25, 1.25),
];

/// Highest configured rate, used for models the table doesn't know so cost
/// accounting over-counts rather than under-counts.
const FALLBACK: (f64, f64) = (15.0, 75.0);

/// Dollar cost of one call, from token usage.
pub fn cost_usd(model: &str, usage: &Usage) -> f64 {
    let (input_rate, output_rate) = RATES
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, i, o)| (*i, *o))
        .unwrap_or(FALLBACK);

    usage.input_tokens as f64 / 1_000_000.0 * input_rate
        + usage.output_tokens as f64 / 1_000_000.0 * output_rate
}
