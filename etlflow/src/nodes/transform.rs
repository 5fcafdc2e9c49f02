//! Transform node: applies the plan to the working dataset.

use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::tools::apply_action;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Applies plan actions sequentially, logging one record per action.
///
/// A data-level failure halts the remaining actions. Actions already
/// applied are not rolled back: the dataset keeps its partial state and
/// recovery plans are written against it.
#[derive(Debug, Default)]
pub struct TransformNode;

impl TransformNode {
    /// Creates the node.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes every action of the current plan in order.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let plan = state
            .transformation_plan
            .clone()
            .ok_or_else(|| NodeError::Planning("no transformation plan available".into()))?;

        for (position, action) in plan.actions().iter().enumerate() {
            let step = position + 1;
            let column = action.column.clone().unwrap_or_else(|| "-".into());

            let dataset = state
                .raw_dataset
                .as_mut()
                .ok_or_else(|| NodeError::Planning("no dataset to transform".into()))?;

            match apply_action(dataset, action) {
                Ok(applied) => {
                    info!(step, action = %action.kind, rows = applied.rows_affected, "action applied");
                    state.log_success(
                        Stage::Transform,
                        format!("{} on '{column}': {}", action.kind, applied.message),
                        HashMap::from([
                            ("step".to_string(), json!(step)),
                            ("action".to_string(), json!(action.kind.as_str())),
                            ("rows_affected".to_string(), json!(applied.rows_affected)),
                        ]),
                    );
                }
                Err(message) => {
                    warn!(step, action = %action.kind, %message, "action failed, halting plan");
                    let sample = state
                        .raw_dataset
                        .as_ref()
                        .map(|d| json!(d.sample_records(3)));
                    return Err(NodeError::Transformation {
                        index: step,
                        action: action.kind.as_str().to_string(),
                        message,
                        sample,
                    });
                }
            }
        }

        let rows = state.raw_dataset.as_ref().map_or(0, |d| d.row_count());
        state.log_success(
            Stage::Transform,
            format!("applied {} actions, {rows} rows remain", plan.len()),
            HashMap::from([
                ("actions".to_string(), json!(plan.len())),
                ("rows".to_string(), json!(rows)),
            ]),
        );
        Ok(())
    }
}
