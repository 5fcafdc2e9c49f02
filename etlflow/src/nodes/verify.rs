//! Verify node: confirms post-load invariants at the sink.

use super::bounded;
use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::tools::LoadTool;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Compares the sink's row count against the loaded dataset.
pub struct VerifyNode {
    tool: Arc<dyn LoadTool>,
    timeout: Duration,
    tolerance: u64,
}

impl VerifyNode {
    /// Creates the node. `tolerance` is the permitted absolute row-count
    /// difference; zero demands an exact match.
    #[must_use]
    pub fn new(tool: Arc<dyn LoadTool>, timeout: Duration, tolerance: u64) -> Self {
        Self {
            tool,
            timeout,
            tolerance,
        }
    }

    /// Verifies the loaded row count within the configured tolerance.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let target = state.target.clone();
        let expected = state
            .raw_dataset
            .as_ref()
            .map(|d| d.row_count() as u64)
            .ok_or_else(|| NodeError::Verify("no dataset to verify against".into()))?;

        let actual = bounded(self.timeout, self.tool.count(&target), |d| {
            NodeError::Verify(format!("count timed out after {:.1}s", d.as_secs_f64()))
        })
        .await
        .map_err(|e| match e {
            verify @ NodeError::Verify(_) => verify,
            other => NodeError::Verify(other.to_string()),
        })?;

        let difference = expected.abs_diff(actual);
        if difference > self.tolerance {
            return Err(NodeError::Verify(format!(
                "expected {expected} rows at '{target}', sink reports {actual}"
            )));
        }

        info!(expected, actual, "load verified");

        state.log_success(
            Stage::Verify,
            format!("verified {actual} rows at '{target}'"),
            HashMap::from([
                ("expected".to_string(), json!(expected)),
                ("actual".to_string(), json!(actual)),
            ]),
        );
        Ok(())
    }
}
