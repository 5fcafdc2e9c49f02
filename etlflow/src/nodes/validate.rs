//! Validate node: synthesizes rules via the oracle and evaluates them.

use super::bounded;
use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::oracle::Oracle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Obtains validation rules for the transformed data and checks them all.
///
/// Evaluation is read-only; the dataset is never mutated here.
pub struct ValidateNode {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    sample_rows: usize,
}

impl ValidateNode {
    /// Creates the node.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration, sample_rows: usize) -> Self {
        Self {
            oracle,
            timeout,
            sample_rows,
        }
    }

    /// Synthesizes rules and evaluates every one against the dataset.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let schema = state.schema_summary.clone().ok_or_else(|| NodeError::Validation {
            rule: "preconditions".into(),
            detail: "no schema summary available".into(),
        })?;
        let sample = state
            .raw_dataset
            .as_ref()
            .map(|d| d.sample_records(self.sample_rows))
            .ok_or_else(|| NodeError::Validation {
                rule: "preconditions".into(),
                detail: "no dataset to validate".into(),
            })?;

        let rules = bounded(
            self.timeout,
            self.oracle.synthesize_rules(&schema, &sample),
            |d| {
                NodeError::Oracle(format!(
                    "rule synthesis timed out after {:.1}s",
                    d.as_secs_f64()
                ))
            },
        )
        .await?;

        state.validation_rules = rules.clone();

        let dataset = state
            .raw_dataset
            .as_ref()
            .ok_or_else(|| NodeError::Validation {
                rule: "preconditions".into(),
                detail: "no dataset to validate".into(),
            })?;

        // Every rule is evaluated so the log shows the complete picture,
        // then the first failing rule drives the error.
        let outcomes: Vec<_> = rules
            .iter()
            .map(|rule| (rule, rule.evaluate(dataset)))
            .collect();

        if let Some((rule, outcome)) = outcomes.iter().find(|(_, o)| !o.passed) {
            return Err(NodeError::Validation {
                rule: rule.description.clone(),
                detail: outcome.detail.clone(),
            });
        }

        info!(rules = rules.len(), "validation passed");

        state.log_success(
            Stage::Validate,
            format!("all {} validation rules passed", rules.len()),
            HashMap::from([(
                "rules".to_string(),
                json!(rules.iter().map(|r| r.description.clone()).collect::<Vec<_>>()),
            )]),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PredicateKind, ValidationRule};
    use crate::testing::{fixtures, ScriptedOracle};

    fn validated_state() -> PipelineState {
        let mut state = PipelineState::new("s", "t", "clean");
        let mut dataset = fixtures::taxi_dataset();
        // Clean the known issues so positivity rules can pass.
        let plan = fixtures::cleanup_plan();
        for action in plan.actions() {
            crate::tools::apply_action(&mut dataset, action).unwrap();
        }
        state.schema_summary = Some(fixtures::schema_for(&dataset));
        state.raw_dataset = Some(dataset);
        state
    }

    #[tokio::test]
    async fn test_passing_rules_are_recorded() {
        let oracle = ScriptedOracle::new();
        oracle.push_rules(Ok(fixtures::positivity_rules()));
        let node = ValidateNode::new(Arc::new(oracle), Duration::from_secs(5), 5);
        let mut state = validated_state();

        node.execute(&mut state).await.unwrap();

        assert_eq!(state.validation_rules.len(), 3);
        assert!(state.execution_log.records()[0]
            .message
            .contains("all 3 validation rules passed"));
    }

    #[tokio::test]
    async fn test_failing_rule_names_itself() {
        let oracle = ScriptedOracle::new();
        oracle.push_rules(Ok(vec![ValidationRule::new(
            PredicateKind::RowCountMin,
            None,
        )
        .with_param("min", json!(1000))]));
        let node = ValidateNode::new(Arc::new(oracle), Duration::from_secs(5), 5);
        let mut state = validated_state();

        let err = node.execute(&mut state).await.unwrap_err();
        match err {
            NodeError::Validation { rule, detail } => {
                assert!(rule.contains("minimum row count"));
                assert!(detail.contains("1000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_revalidating_valid_dataset_passes_again() {
        let oracle = ScriptedOracle::new();
        oracle.push_rules(Ok(fixtures::positivity_rules()));
        oracle.push_rules(Ok(fixtures::positivity_rules()));
        let node = ValidateNode::new(Arc::new(oracle), Duration::from_secs(5), 5);
        let mut state = validated_state();

        node.execute(&mut state).await.unwrap();
        node.execute(&mut state).await.unwrap();
        assert_eq!(state.execution_log.len(), 2);
    }

    #[tokio::test]
    async fn test_oracle_failure_propagates() {
        let oracle = ScriptedOracle::new();
        oracle.push_rules(Err(NodeError::Oracle("no rules today".into())));
        let node = ValidateNode::new(Arc::new(oracle), Duration::from_secs(5), 5);
        let mut state = validated_state();

        let err = node.execute(&mut state).await.unwrap_err();
        assert_eq!(err.category(), "OracleError");
    }
}
