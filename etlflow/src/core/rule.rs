//! Validation rules synthesized by the oracle and evaluated locally.
//!
//! Rules arrive as untrusted JSON and go through the same tagged-variant
//! parsing as plan actions. Evaluation is pure: it never mutates the
//! dataset, so re-validating a passing dataset always passes again.

use crate::dataset::{cell_f64, Dataset};
use crate::errors::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed vocabulary of validation predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    /// The column must contain no nulls.
    NotNull,
    /// Every non-null value must be a non-negative number.
    Positive,
    /// Every non-null value must fall inside `[min, max]`.
    InRange,
    /// Every non-null value must be distinct.
    Unique,
    /// The dataset must contain at least `min` rows.
    RowCountMin,
}

impl PredicateKind {
    /// All allow-listed predicates.
    pub const ALL: [Self; 5] = [
        Self::NotNull,
        Self::Positive,
        Self::InRange,
        Self::Unique,
        Self::RowCountMin,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotNull => "not_null",
            Self::Positive => "positive",
            Self::InRange => "in_range",
            Self::Unique => "unique",
            Self::RowCountMin => "row_count",
        }
    }

    /// Looks a wire name up in the allow-list.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// A predicate over the dataset that must hold after transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRule {
    /// Human-readable statement of the rule.
    pub description: String,
    /// The predicate to evaluate.
    pub predicate: PredicateKind,
    /// The column the predicate applies to, if column-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Predicate parameters (min, max).
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

/// The outcome of evaluating one rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    /// Whether the rule held.
    pub passed: bool,
    /// Counts and offending values.
    pub detail: String,
}

impl ValidationRule {
    /// Creates a rule with a generated description.
    #[must_use]
    pub fn new(predicate: PredicateKind, column: Option<&str>) -> Self {
        let mut rule = Self {
            description: String::new(),
            predicate,
            column: column.map(String::from),
            params: serde_json::Map::new(),
        };
        rule.description = rule.describe();
        rule
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Parses one rule from untrusted JSON.
    pub fn from_value(value: &Value) -> Result<Self, NodeError> {
        let entry = value
            .as_object()
            .ok_or_else(|| NodeError::Oracle("rule entry is not an object".into()))?;

        let name = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Oracle("rule entry is missing a 'type' tag".into()))?;

        let predicate = PredicateKind::parse(name)
            .ok_or_else(|| NodeError::Oracle(format!("unknown rule type '{name}'")))?;

        let column = entry.get("column").and_then(Value::as_str).map(String::from);

        let params = entry
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "type" | "column" | "description"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut rule = Self {
            description: String::new(),
            predicate,
            column,
            params,
        };
        rule.description = entry
            .get("description")
            .and_then(Value::as_str)
            .map_or_else(|| rule.describe(), String::from);

        Ok(rule)
    }

    /// Evaluates the rule against a dataset.
    #[must_use]
    pub fn evaluate(&self, dataset: &Dataset) -> RuleOutcome {
        match self.predicate {
            PredicateKind::RowCountMin => {
                let min = self
                    .params
                    .get("min")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize;
                let rows = dataset.row_count();
                RuleOutcome {
                    passed: rows >= min,
                    detail: format!("{rows} rows, minimum {min}"),
                }
            }
            _ => self.evaluate_column(dataset),
        }
    }

    fn evaluate_column(&self, dataset: &Dataset) -> RuleOutcome {
        let Some(name) = self.column.as_deref() else {
            return RuleOutcome {
                passed: false,
                detail: format!("rule '{}' names no column", self.predicate.as_str()),
            };
        };
        let Some(column) = dataset.column_index(name) else {
            return RuleOutcome {
                passed: false,
                detail: format!("column '{name}' does not exist"),
            };
        };

        match self.predicate {
            PredicateKind::NotNull => {
                let nulls = dataset.null_count(column);
                RuleOutcome {
                    passed: nulls == 0,
                    detail: format!("found {nulls} null values"),
                }
            }
            PredicateKind::Positive => {
                let violations = dataset
                    .values(column)
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .filter(|v| cell_f64(v).map_or(true, |n| n < 0.0))
                    .count();
                RuleOutcome {
                    passed: violations == 0,
                    detail: format!("found {violations} negative or non-numeric values"),
                }
            }
            PredicateKind::InRange => {
                let min = self.params.get("min").and_then(Value::as_f64);
                let max = self.params.get("max").and_then(Value::as_f64);
                let violations = dataset
                    .values(column)
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .filter(|v| {
                        cell_f64(v).map_or(true, |n| {
                            min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m)
                        })
                    })
                    .count();
                RuleOutcome {
                    passed: violations == 0,
                    detail: format!("found {violations} out-of-range values"),
                }
            }
            PredicateKind::Unique => {
                let non_null = dataset
                    .values(column)
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .count();
                let duplicates = non_null - dataset.distinct_count(column);
                RuleOutcome {
                    passed: duplicates == 0,
                    detail: format!("found {duplicates} duplicate values"),
                }
            }
            PredicateKind::RowCountMin => unreachable!("handled in evaluate"),
        }
    }

    /// Generates a description from the predicate and target.
    fn describe(&self) -> String {
        let column = self.column.as_deref().unwrap_or("<dataset>");
        match self.predicate {
            PredicateKind::NotNull => format!("{column} should not contain nulls"),
            PredicateKind::Positive => format!("{column} should be positive"),
            PredicateKind::InRange => format!("{column} should be within range"),
            PredicateKind::Unique => format!("{column} should be unique"),
            PredicateKind::RowCountMin => "dataset should meet the minimum row count".into(),
        }
    }
}
