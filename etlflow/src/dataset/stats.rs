//! Column statistics over JSON cells.

use serde_json::Value;
use std::collections::HashMap;

/// Extracts a numeric cell as `f64`.
///
/// Only JSON numbers qualify; numeric-looking strings are left to the
/// `convert_numeric` action to coerce explicitly.
#[must_use]
pub fn cell_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median, `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent non-null value, `None` if every cell is null.
///
/// Ties resolve to the value seen first, so the result is deterministic.
#[must_use]
pub fn mode<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<String, (usize, usize, &Value)> = HashMap::new();

    for (position, value) in values.filter(|v| !v.is_null()).enumerate() {
        let entry = counts
            .entry(value.to_string())
            .or_insert((0, position, value));
        entry.0 += 1;
    }

    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, value)| value.clone())
}
