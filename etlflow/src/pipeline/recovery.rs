//! The error handler: oracle-guided re-planning bounded by the retry budget.

use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::nodes::bounded;
use crate::oracle::Oracle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of an error-handler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// A recovery plan was accepted; re-enter at Transform.
    Resume,
    /// The retry budget is exhausted; terminate the run.
    Exhausted,
}

/// Builds recovery context from the failure record and log tail, asks the
/// oracle for a corrected plan, and validates it exactly as the plan node
/// does (validation happens inside response parsing).
pub struct ErrorHandler {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    log_tail: usize,
}

impl ErrorHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration, log_tail: usize) -> Self {
        Self {
            oracle,
            timeout,
            log_tail,
        }
    }

    /// Attempts recovery until a plan is accepted or the budget runs out.
    ///
    /// Every oracle attempt - successful or not - consumes one retry, so a
    /// misbehaving oracle exhausts the budget instead of looping forever.
    pub async fn execute(&self, state: &mut PipelineState, max_retries: u32) -> Recovery {
        loop {
            if state.retry_count >= max_retries {
                warn!(retries = state.retry_count, "retry budget exhausted");
                state.log_failure(
                    Stage::Recovery,
                    format!("retry budget exhausted after {} attempts", state.retry_count),
                );
                return Recovery::Exhausted;
            }

            let Some(error) = state.error_record.clone() else {
                state.log_failure(Stage::Recovery, "no failure context to recover from");
                return Recovery::Exhausted;
            };
            let Some(schema) = state.schema_summary.clone() else {
                state.log_failure(Stage::Recovery, "no schema context to recover with");
                return Recovery::Exhausted;
            };
            let tail = state.execution_log.tail(self.log_tail).to_vec();

            state.retry_count += 1;
            let attempt = state.retry_count;

            let recovered = bounded(
                self.timeout,
                self.oracle.recover(&error, &schema, &tail),
                |d| {
                    NodeError::Oracle(format!(
                        "oracle recovery timed out after {:.1}s",
                        d.as_secs_f64()
                    ))
                },
            )
            .await;

            match recovered {
                Ok(plan) => {
                    info!(attempt, steps = plan.len(), "recovery plan accepted");
                    state.log_success(
                        Stage::Recovery,
                        format!(
                            "attempt {attempt}: recovery plan with {} steps accepted",
                            plan.len()
                        ),
                        HashMap::from([
                            ("attempt".to_string(), json!(attempt)),
                            ("actions".to_string(), json!(plan.kinds())),
                        ]),
                    );
                    state.transformation_plan = Some(plan);
                    state.clear_error();
                    return Recovery::Resume;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "recovery attempt failed");
                    state.log_failure(
                        Stage::Recovery,
                        format!("attempt {attempt}: {}: {err}", err.category()),
                    );
                    // Keep the original error record; the next pass retries
                    // against the same failure until the budget runs out.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorRecord, PipelineState};
    use crate::testing::{fixtures, ScriptedOracle};

    fn failed_state() -> PipelineState {
        let mut state = PipelineState::new("s", "t", "clean");
        let dataset = fixtures::taxi_dataset();
        state.schema_summary = Some(fixtures::schema_for(&dataset));
        state.raw_dataset = Some(dataset);
        state.set_error(ErrorRecord::from_error(
            Stage::Transform,
            &NodeError::Transformation {
                index: 1,
                action: "remove_negative".into(),
                message: "column 'x' contains non-numeric value \"INVALID\"".into(),
                sample: None,
            },
        ));
        state
    }

    fn handler(oracle: ScriptedOracle) -> ErrorHandler {
        ErrorHandler::new(Arc::new(oracle), Duration::from_secs(5), 20)
    }

    #[tokio::test]
    async fn test_accepted_plan_resumes_and_clears_error() {
        let oracle = ScriptedOracle::new();
        oracle.push_recovery(Ok(fixtures::cleanup_plan()));
        let mut state = failed_state();

        let outcome = handler(oracle).execute(&mut state, 2).await;

        assert_eq!(outcome, Recovery::Resume);
        assert_eq!(state.retry_count, 1);
        assert!(state.error_record.is_none());
        assert!(state.transformation_plan.is_some());
    }

    #[tokio::test]
    async fn test_exhausted_budget_terminates() {
        let oracle = ScriptedOracle::new();
        let mut state = failed_state();
        state.retry_count = 2;

        let outcome = handler(oracle).execute(&mut state, 2).await;

        assert_eq!(outcome, Recovery::Exhausted);
        assert_eq!(state.retry_count, 2);
        assert!(state.error_record.is_some());
    }

    #[tokio::test]
    async fn test_failing_oracle_consumes_budget() {
        let oracle = ScriptedOracle::new();
        oracle.push_recovery(Err(NodeError::Oracle("unreachable".into())));
        oracle.push_recovery(Err(NodeError::Oracle("unreachable".into())));
        let mut state = failed_state();

        let outcome = handler(oracle).execute(&mut state, 2).await;

        assert_eq!(outcome, Recovery::Exhausted);
        assert_eq!(state.retry_count, 2);
        // Two failed attempts plus the exhaustion record.
        assert_eq!(state.execution_log.failure_count(), 3);
    }

    #[tokio::test]
    async fn test_disallowed_recovery_plan_consumes_budget() {
        let oracle = ScriptedOracle::new();
        oracle.push_recovery_json(&json!([{"action": "shell_out", "column": "x"}]));
        oracle.push_recovery(Ok(fixtures::cleanup_plan()));
        let mut state = failed_state();

        let outcome = handler(oracle).execute(&mut state, 3).await;

        assert_eq!(outcome, Recovery::Resume);
        assert_eq!(state.retry_count, 2);
        assert!(state
            .execution_log
            .records()
            .iter()
            .any(|r| r.message.contains("PlanningError")));
    }

    #[tokio::test]
    async fn test_missing_schema_cannot_recover() {
        let oracle = ScriptedOracle::new();
        let mut state = failed_state();
        state.schema_summary = None;

        let outcome = handler(oracle).execute(&mut state, 2).await;
        assert_eq!(outcome, Recovery::Exhausted);
    }
}
