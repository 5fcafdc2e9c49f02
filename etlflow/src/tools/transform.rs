//! Execution of allow-listed transformation actions.
//!
//! Action kinds are already validated at parse time; this module only has
//! to handle data-level failures (missing columns, non-numeric cells, bad
//! parameters), which it reports as plain error strings for the transform
//! node to wrap with plan position and a data sample.

use crate::core::{parse_datetime, Action, ActionKind};
use crate::dataset::{cell_f64, mean, median, mode, Dataset};
use serde_json::Value;
use std::collections::HashSet;

/// Result of applying one action.
#[derive(Debug, Clone)]
pub struct AppliedAction {
    /// Rows (or cells, for column-wise coercions) the action touched.
    pub rows_affected: usize,
    /// Human-readable description of the effect.
    pub message: String,
}

/// Applies a single action to the dataset in place.
///
/// On error the dataset keeps every change made by previously applied
/// actions; nothing is rolled back.
pub fn apply_action(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    match action.kind {
        ActionKind::ConvertDatetime => convert_datetime(dataset, action),
        ActionKind::FillNull => fill_null(dataset, action),
        ActionKind::RemoveNegative => remove_negative(dataset, action),
        ActionKind::RemoveInvalid => remove_invalid(dataset, action),
        ActionKind::ConvertNumeric => convert_numeric(dataset, action),
        ActionKind::RenameColumn => rename_column(dataset, action),
        ActionKind::DropColumn => drop_column(dataset, action),
        ActionKind::StandardizeText => standardize_text(dataset, action),
        ActionKind::RemoveDuplicates => remove_duplicates(dataset, action),
    }
}

fn target_column(dataset: &Dataset, action: &Action) -> Result<usize, String> {
    let name = action
        .column
        .as_deref()
        .ok_or_else(|| format!("action '{}' requires a column", action.kind))?;
    dataset
        .column_index(name)
        .ok_or_else(|| format!("column '{name}' does not exist"))
}

fn rows_word(n: usize) -> &'static str {
    if n == 1 {
        "row"
    } else {
        "rows"
    }
}

fn values_word(n: usize) -> &'static str {
    if n == 1 {
        "value"
    } else {
        "values"
    }
}

fn convert_datetime(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;

    let mut converted = 0;
    let mut coerced = 0;
    dataset.map_column(column, |cell| match cell {
        Value::Null => Value::Null,
        Value::String(s) => parse_datetime(s).map_or_else(
            || {
                coerced += 1;
                Value::Null
            },
            |dt| {
                converted += 1;
                Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            },
        ),
        _ => {
            coerced += 1;
            Value::Null
        }
    });

    Ok(AppliedAction {
        rows_affected: converted + coerced,
        message: format!(
            "converted {converted} {} to datetime, {coerced} coerced to null",
            values_word(converted)
        ),
    })
}

fn numeric_column(dataset: &Dataset, column: usize, name: &str) -> Result<Vec<f64>, String> {
    dataset
        .values(column)
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| {
            cell_f64(v).ok_or_else(|| format!("column '{name}' contains non-numeric value {v}"))
        })
        .collect()
}

fn fill_null(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let name = action.column.as_deref().unwrap_or_default();
    let strategy = action
        .param_str("strategy")
        .ok_or("fill_null requires a 'strategy' parameter")?;

    let nulls = dataset.null_count(column);

    let fill = match strategy {
        "value" => action
            .params
            .get("value")
            .cloned()
            .ok_or("strategy 'value' requires a 'value' parameter")?,
        "mean" | "median" => {
            let numbers = numeric_column(dataset, column, name)?;
            let aggregate = if strategy == "mean" {
                mean(&numbers)
            } else {
                median(&numbers)
            };
            let aggregate =
                aggregate.ok_or_else(|| format!("column '{name}' has no values to aggregate"))?;
            serde_json::json!(aggregate)
        }
        "mode" => {
            let values = dataset.values(column);
            mode(values.into_iter())
                .ok_or_else(|| format!("column '{name}' has no non-null values"))?
        }
        "drop" => {
            let removed = dataset.retain_rows(|row| !row[column].is_null());
            return Ok(AppliedAction {
                rows_affected: removed,
                message: format!(
                    "dropped {removed} {} with null values",
                    rows_word(removed)
                ),
            });
        }
        other => return Err(format!("unknown fill strategy '{other}'")),
    };

    dataset.map_column(column, |cell| {
        if cell.is_null() {
            fill.clone()
        } else {
            cell.clone()
        }
    });

    Ok(AppliedAction {
        rows_affected: nulls,
        message: format!(
            "filled {nulls} null {} using {strategy}",
            values_word(nulls)
        ),
    })
}

fn remove_negative(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let name = action.column.as_deref().unwrap_or_default();

    // Fails fast on non-numeric cells so the oracle learns the column needs
    // coercion first.
    numeric_column(dataset, column, name)?;

    let removed =
        dataset.retain_rows(|row| row[column].is_null() || cell_f64(&row[column]) >= Some(0.0));

    Ok(AppliedAction {
        rows_affected: removed,
        message: format!(
            "removed {removed} {} with negative values",
            rows_word(removed)
        ),
    })
}

fn remove_invalid(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let allowed: HashSet<String> = action
        .param_array("valid_values")
        .ok_or("remove_invalid requires a 'valid_values' parameter")?
        .iter()
        .map(std::string::ToString::to_string)
        .collect();

    let removed = dataset.retain_rows(|row| allowed.contains(&row[column].to_string()));

    Ok(AppliedAction {
        rows_affected: removed,
        message: format!(
            "removed {removed} {} with invalid values",
            rows_word(removed)
        ),
    })
}

fn convert_numeric(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;

    let mut converted = 0;
    let mut coerced = 0;
    dataset.map_column(column, |cell| match cell {
        Value::Null => Value::Null,
        Value::Number(_) => cell.clone(),
        Value::String(s) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                converted += 1;
                serde_json::json!(i)
            } else if let Ok(f) = s.trim().parse::<f64>() {
                converted += 1;
                serde_json::json!(f)
            } else {
                coerced += 1;
                Value::Null
            }
        }
        Value::Bool(b) => {
            converted += 1;
            serde_json::json!(i64::from(*b))
        }
        _ => {
            coerced += 1;
            Value::Null
        }
    });

    Ok(AppliedAction {
        rows_affected: converted + coerced,
        message: format!(
            "converted {converted} {} to numeric, {coerced} coerced to null",
            values_word(converted)
        ),
    })
}

fn rename_column(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let old = action.column.clone().unwrap_or_default();
    let new = action
        .param_str("new_name")
        .ok_or("rename_column requires a 'new_name' parameter")?
        .to_string();

    if dataset.has_column(&new) {
        return Err(format!("column '{new}' already exists"));
    }
    dataset.rename_column(column, &new);

    Ok(AppliedAction {
        rows_affected: 0,
        message: format!("renamed '{old}' to '{new}'"),
    })
}

fn drop_column(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let name = action.column.clone().unwrap_or_default();
    dataset.drop_column(column);

    Ok(AppliedAction {
        rows_affected: 0,
        message: format!("dropped column '{name}'"),
    })
}

fn standardize_text(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let column = target_column(dataset, action)?;
    let case = action.param_str("case").unwrap_or("lower");
    if !matches!(case, "lower" | "upper" | "title") {
        return Err(format!("unknown text case '{case}'"));
    }

    let mut changed = 0;
    dataset.map_column(column, |cell| {
        cell.as_str().map_or_else(
            || cell.clone(),
            |s| {
                let standardized = match case {
                    "lower" => s.to_lowercase(),
                    "upper" => s.to_uppercase(),
                    _ => title_case(s),
                };
                if standardized != s {
                    changed += 1;
                }
                Value::String(standardized)
            },
        )
    });

    Ok(AppliedAction {
        rows_affected: changed,
        message: format!("standardized {changed} {} to {case} case", values_word(changed)),
    })
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn remove_duplicates(dataset: &mut Dataset, action: &Action) -> Result<AppliedAction, String> {
    let subset = match action.param_array("subset") {
        Some(names) => {
            let indices = names
                .iter()
                .map(|n| {
                    let name = n
                        .as_str()
                        .ok_or_else(|| format!("subset entry {n} is not a column name"))?;
                    dataset
                        .column_index(name)
                        .ok_or_else(|| format!("column '{name}' does not exist"))
                })
                .collect::<Result<Vec<_>, String>>()?;
            Some(indices)
        }
        None => None,
    };

    let removed = dataset.dedup_rows(subset.as_deref());

    Ok(AppliedAction {
        rows_affected: removed,
        message: format!("removed {removed} duplicate {}", rows_word(removed)),
    })
}
