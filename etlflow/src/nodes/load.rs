//! Load node: hands the validated dataset to the sink.

use super::bounded;
use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::tools::LoadTool;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runs the load tool and records the loaded row count.
pub struct LoadNode {
    tool: Arc<dyn LoadTool>,
    timeout: Duration,
}

impl LoadNode {
    /// Creates the node.
    #[must_use]
    pub fn new(tool: Arc<dyn LoadTool>, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// Loads the working dataset into the state's target.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let target = state.target.clone();
        let dataset = state
            .raw_dataset
            .as_ref()
            .ok_or_else(|| NodeError::Load("no dataset to load".into()))?;

        let rows = bounded(self.timeout, self.tool.load(dataset, &target), |d| {
            NodeError::Load(format!("load timed out after {:.1}s", d.as_secs_f64()))
        })
        .await?;

        info!(rows, target = %target, "dataset loaded");

        state.log_success(
            Stage::Load,
            format!("loaded {rows} rows into '{target}'"),
            HashMap::from([("rows_loaded".to_string(), json!(rows))]),
        );
        state.rows_loaded = Some(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, FailingSink};
    use crate::tools::MemorySink;

    #[tokio::test]
    async fn test_load_records_row_count() {
        let sink = Arc::new(MemorySink::new());
        let node = LoadNode::new(sink.clone(), Duration::from_secs(5));
        let mut state = PipelineState::new("s", "trips", "clean");
        state.raw_dataset = Some(fixtures::taxi_dataset());

        node.execute(&mut state).await.unwrap();

        assert_eq!(state.rows_loaded, Some(4));
        assert_eq!(sink.table("trips").unwrap().row_count(), 4);
    }

    #[tokio::test]
    async fn test_sink_failure_is_load_error() {
        let node = LoadNode::new(
            Arc::new(FailingSink::new("connection refused")),
            Duration::from_secs(5),
        );
        let mut state = PipelineState::new("s", "trips", "clean");
        state.raw_dataset = Some(fixtures::taxi_dataset());

        let err = node.execute(&mut state).await.unwrap_err();
        assert_eq!(err.category(), "LoadError");
        assert!(state.rows_loaded.is_none());
    }
}
