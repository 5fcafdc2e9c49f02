//! Dataset profiling and schema summaries.
//!
//! [`DataProfile::of`] computes a deterministic structural profile of a
//! dataset - types, null ratios, ranges, quality anomalies. The profile is
//! the context handed to the oracle, whose reply comes back as a
//! [`SchemaSummary`]: the same per-column shape plus free-text commentary.

use crate::dataset::{cell_f64, mean, Dataset};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// All non-null cells are integers.
    Integer,
    /// All non-null cells are numbers, at least one fractional.
    Float,
    /// All non-null cells are booleans.
    Boolean,
    /// All non-null cells are strings.
    Text,
    /// All non-null cells are strings that parse as datetimes.
    Datetime,
    /// Every cell is null.
    Null,
    /// Cells of differing JSON types.
    Mixed,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Datetime => "datetime",
            Self::Null => "null",
            Self::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// A data-quality anomaly detected during profiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Numeric cells below zero.
    NegativeValues {
        /// Affected row count.
        rows: usize,
    },
    /// Numeric-looking column polluted with non-numeric cells.
    MixedTypes {
        /// Affected row count.
        rows: usize,
        /// A few of the offending values.
        samples: Vec<String>,
    },
    /// Null cells present.
    NullValues {
        /// Affected row count.
        rows: usize,
        /// Fraction of the column that is null.
        ratio: f64,
    },
    /// Some, but not all, values parse as datetimes.
    PossibleDatetime,
}

/// Structural profile of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,
    /// Inferred type.
    pub dtype: ColumnType,
    /// Null cell count.
    pub null_count: usize,
    /// Null fraction of the column.
    pub null_ratio: f64,
    /// Distinct non-null value count.
    pub distinct_count: usize,
    /// A few non-null sample values.
    pub samples: Vec<Value>,
    /// Minimum, for numeric columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum, for numeric columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Mean, for numeric columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Detected anomalies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<Anomaly>,
}

/// Deterministic structural profile of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    /// Row count at profiling time.
    pub row_count: usize,
    /// Column count.
    pub column_count: usize,
    /// Per-column profiles, in column order.
    pub columns: Vec<ColumnProfile>,
}

impl DataProfile {
    /// Profiles a dataset.
    #[must_use]
    pub fn of(dataset: &Dataset) -> Self {
        let columns = dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(index, name)| profile_column(dataset, index, name))
            .collect();

        Self {
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            columns,
        }
    }

    /// Total number of anomalies across all columns.
    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.columns.iter().map(|c| c.anomalies.len()).sum()
    }
}

/// The oracle's interpretation of a profile: the structural facts plus
/// free-text observations used by planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSummary {
    /// Row count at analysis time.
    pub row_count: usize,
    /// Per-column profiles.
    pub columns: Vec<ColumnProfile>,
    /// Oracle commentary on what the data represents and its issues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SchemaSummary {
    /// Builds a summary straight from a local profile, with no commentary.
    ///
    /// This is the inference fallback used when no richer interpretation is
    /// available.
    #[must_use]
    pub fn from_profile(profile: DataProfile) -> Self {
        Self {
            row_count: profile.row_count,
            columns: profile.columns,
            notes: None,
        }
    }

    /// The profile of a named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Parses the datetime shapes the pipeline accepts.
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn profile_column(dataset: &Dataset, index: usize, name: &str) -> ColumnProfile {
    let values = dataset.values(index);
    let non_null: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

    let null_count = values.len() - non_null.len();
    let null_ratio = if values.is_empty() {
        0.0
    } else {
        null_count as f64 / values.len() as f64
    };

    let dtype = infer_type(&non_null);

    let numeric: Vec<f64> = non_null.iter().filter_map(|v| cell_f64(v)).collect();
    let (min, max, col_mean) = if matches!(dtype, ColumnType::Integer | ColumnType::Float) {
        (
            numeric.iter().copied().reduce(f64::min),
            numeric.iter().copied().reduce(f64::max),
            mean(&numeric),
        )
    } else {
        (None, None, None)
    };

    let mut anomalies = Vec::new();

    let negative = numeric.iter().filter(|&&n| n < 0.0).count();
    if negative > 0 {
        anomalies.push(Anomaly::NegativeValues { rows: negative });
    }

    // A column is "mixed" for planning purposes when part of it is numeric
    // (as numbers or numeric strings) and part is not.
    let numeric_like = non_null
        .iter()
        .filter(|v| cell_f64(v).is_some() || v.as_str().is_some_and(|s| s.parse::<f64>().is_ok()))
        .count();
    if numeric_like > 0 && numeric_like < non_null.len() {
        let samples = non_null
            .iter()
            .filter(|v| cell_f64(v).is_none() && !v.as_str().is_some_and(|s| s.parse::<f64>().is_ok()))
            .take(3)
            .map(|v| v.as_str().map_or_else(|| v.to_string(), String::from))
            .collect();
        anomalies.push(Anomaly::MixedTypes {
            rows: non_null.len() - numeric_like,
            samples,
        });
    }

    if null_count > 0 {
        anomalies.push(Anomaly::NullValues {
            rows: null_count,
            ratio: null_ratio,
        });
    }

    if dtype == ColumnType::Text {
        let parseable = non_null
            .iter()
            .filter(|v| v.as_str().is_some_and(|s| parse_datetime(s).is_some()))
            .count();
        if parseable > 0 && parseable < non_null.len() {
            anomalies.push(Anomaly::PossibleDatetime);
        }
    }

    ColumnProfile {
        name: name.to_string(),
        dtype,
        null_count,
        null_ratio,
        distinct_count: dataset.distinct_count(index),
        samples: non_null.iter().take(3).map(|v| (*v).clone()).collect(),
        min,
        max,
        mean: col_mean,
        anomalies,
    }
}

fn infer_type(non_null: &[&Value]) -> ColumnType {
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut ints = 0;
    let mut floats = 0;
    let mut bools = 0;
    let mut strings = 0;
    let mut other = 0;
    for value in non_null {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => ints += 1,
            Value::Number(_) => floats += 1,
            Value::Bool(_) => bools += 1,
            Value::String(_) => strings += 1,
            _ => other += 1,
        }
    }

    let total = non_null.len();
    if other > 0 {
        ColumnType::Mixed
    } else if ints == total {
        ColumnType::Integer
    } else if ints + floats == total {
        ColumnType::Float
    } else if bools == total {
        ColumnType::Boolean
    } else if strings == total {
        let datetimes = non_null
            .iter()
            .filter(|v| v.as_str().is_some_and(|s| parse_datetime(s).is_some()))
            .count();
        if datetimes == total {
            ColumnType::Datetime
        } else {
            ColumnType::Text
        }
    } else {
        ColumnType::Mixed
    }
}
