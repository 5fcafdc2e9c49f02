//! Plan node: obtains the ordered transformation plan from the oracle.

use super::bounded;
use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::oracle::Oracle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Asks the oracle for a plan and installs it after validation.
///
/// The allow-list check happens during response parsing, before any
/// destructive operation, so a rejected plan fails the run with nothing to
/// roll back.
pub struct PlanNode {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    log_tail: usize,
}

impl PlanNode {
    /// Creates the node.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration, log_tail: usize) -> Self {
        Self {
            oracle,
            timeout,
            log_tail,
        }
    }

    /// Plans transformations for the analyzed schema and caller intent.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let schema = state
            .schema_summary
            .clone()
            .ok_or_else(|| NodeError::Planning("no schema summary available".into()))?;
        let intent = state.intent.clone();
        let tail = state.execution_log.tail(self.log_tail).to_vec();

        let plan = bounded(
            self.timeout,
            self.oracle.plan(&schema, &intent, &tail),
            |d| NodeError::Oracle(format!("oracle planning timed out after {:.1}s", d.as_secs_f64())),
        )
        .await?;

        info!(steps = plan.len(), "transformation plan accepted");

        state.log_success(
            Stage::Plan,
            format!("planned {} transformation steps", plan.len()),
            HashMap::from([("actions".to_string(), json!(plan.kinds()))]),
        );
        state.transformation_plan = Some(plan);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Action, ActionKind, TransformationPlan};
    use crate::testing::{fixtures, ScriptedOracle};

    fn planned_state() -> PipelineState {
        let mut state = PipelineState::new("s", "t", "clean the taxi data");
        let dataset = fixtures::taxi_dataset();
        state.schema_summary = Some(fixtures::schema_for(&dataset));
        state.raw_dataset = Some(dataset);
        state
    }

    #[tokio::test]
    async fn test_plan_installs_actions() {
        let oracle = ScriptedOracle::new();
        oracle.push_plan(Ok(TransformationPlan::new(vec![Action::new(
            ActionKind::RemoveNegative,
        )
        .with_column("passenger_count")])));
        let node = PlanNode::new(Arc::new(oracle), Duration::from_secs(5), 20);
        let mut state = planned_state();

        node.execute(&mut state).await.unwrap();

        let plan = state.transformation_plan.unwrap();
        assert_eq!(plan.kinds(), vec!["remove_negative"]);
        assert!(state.execution_log.records()[0]
            .message
            .contains("planned 1 transformation"));
    }

    #[tokio::test]
    async fn test_disallowed_kind_surfaces_planning_error() {
        let oracle = ScriptedOracle::new();
        oracle.push_plan_json(&json!([{"action": "run_shell", "column": "x"}]));
        let node = PlanNode::new(Arc::new(oracle), Duration::from_secs(5), 20);
        let mut state = planned_state();

        let err = node.execute(&mut state).await.unwrap_err();
        assert_eq!(err.category(), "PlanningError");
        assert!(state.transformation_plan.is_none());
    }

    #[tokio::test]
    async fn test_missing_schema_is_planning_error() {
        let node = PlanNode::new(Arc::new(ScriptedOracle::new()), Duration::from_secs(5), 20);
        let mut state = PipelineState::new("s", "t", "clean");

        let err = node.execute(&mut state).await.unwrap_err();
        assert_eq!(err.category(), "PlanningError");
    }
}
