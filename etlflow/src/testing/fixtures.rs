//! Shared fixtures shaped like the NYC taxi sample this pipeline is
//! typically pointed at.

use crate::core::{
    Action, ActionKind, DataProfile, PredicateKind, SchemaSummary, TransformationPlan,
    ValidationRule,
};
use crate::dataset::Dataset;
use serde_json::{json, Value};

/// Four taxi trips: one null `passenger_count`, one negative.
#[must_use]
pub fn taxi_records() -> Value {
    json!([
        {"VendorID": 1, "passenger_count": 1, "trip_distance": 2.5, "fare_amount": 12.0},
        {"VendorID": 2, "passenger_count": null, "trip_distance": 1.1, "fare_amount": 6.5},
        {"VendorID": 1, "passenger_count": -1, "trip_distance": 0.8, "fare_amount": 5.0},
        {"VendorID": 2, "passenger_count": 3, "trip_distance": 4.2, "fare_amount": 18.5}
    ])
}

/// [`taxi_records`] as a dataset.
#[must_use]
pub fn taxi_dataset() -> Dataset {
    records_to_dataset(&taxi_records())
}

/// Taxi trips whose `RatecodeID` column is polluted with a non-numeric
/// value, plus a null `passenger_count`.
#[must_use]
pub fn ratecode_records() -> Value {
    json!([
        {"RatecodeID": 1, "passenger_count": 1, "fare_amount": 9.0},
        {"RatecodeID": "INVALID", "passenger_count": null, "fare_amount": 7.5},
        {"RatecodeID": 2, "passenger_count": 2, "fare_amount": 11.0}
    ])
}

/// [`ratecode_records`] as a dataset.
#[must_use]
pub fn ratecode_dataset() -> Dataset {
    records_to_dataset(&ratecode_records())
}

/// A local schema summary for a dataset, with no oracle commentary.
#[must_use]
pub fn schema_for(dataset: &Dataset) -> SchemaSummary {
    SchemaSummary::from_profile(DataProfile::of(dataset))
}

/// The canonical cleanup plan: fill null passenger counts with the median,
/// then drop negative ones.
#[must_use]
pub fn cleanup_plan() -> TransformationPlan {
    TransformationPlan::new(vec![
        Action::new(ActionKind::FillNull)
            .with_column("passenger_count")
            .with_param("strategy", json!("median")),
        Action::new(ActionKind::RemoveNegative).with_column("passenger_count"),
    ])
}

/// Builds a plan from `(kind, column, params)` triples.
///
/// # Panics
///
/// Panics if a kind is not in the allow-list; fixtures only describe valid
/// plans.
#[must_use]
pub fn plan_of(steps: &[(&str, &str, &[(&str, Value)])]) -> TransformationPlan {
    let actions = steps
        .iter()
        .map(|(kind, column, params)| {
            let kind = ActionKind::parse(kind)
                .unwrap_or_else(|| panic!("fixture uses unknown action kind '{kind}'"));
            let mut action = Action::new(kind);
            if !column.is_empty() {
                action = action.with_column(*column);
            }
            for (key, value) in *params {
                action = action.with_param(*key, value.clone());
            }
            action
        })
        .collect();

    TransformationPlan::new(actions)
}

/// Non-null and positivity constraints on `passenger_count` plus a minimum
/// row count.
#[must_use]
pub fn positivity_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new(PredicateKind::NotNull, Some("passenger_count")),
        ValidationRule::new(PredicateKind::Positive, Some("passenger_count")),
        ValidationRule::new(PredicateKind::RowCountMin, None).with_param("min", json!(1)),
    ]
}

fn records_to_dataset(records: &Value) -> Dataset {
    let rows: Vec<serde_json::Map<String, Value>> = records
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_object().cloned())
                .collect()
        })
        .unwrap_or_default();
    Dataset::from_records(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxi_dataset_shape() {
        let ds = taxi_dataset();
        assert_eq!(ds.row_count(), 4);
        let passengers = ds.column_index("passenger_count").unwrap();
        assert_eq!(ds.null_count(passengers), 1);
    }

    #[test]
    fn test_plan_of_builds_actions() {
        let plan = plan_of(&[
            ("convert_numeric", "RatecodeID", &[]),
            ("fill_null", "RatecodeID", &[("strategy", json!("mode"))]),
        ]);

        assert_eq!(plan.kinds(), vec!["convert_numeric", "fill_null"]);
        assert_eq!(plan.actions()[1].param_str("strategy"), Some("mode"));
    }

    #[test]
    fn test_cleanup_plan_matches_vocabulary() {
        for action in cleanup_plan().actions() {
            assert!(ActionKind::parse(action.kind.as_str()).is_some());
        }
    }
}
