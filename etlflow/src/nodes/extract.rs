//! Extract node: pulls the dataset from the source.

use super::bounded;
use crate::core::{PipelineState, Stage};
use crate::errors::NodeError;
use crate::tools::ExtractTool;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runs the extract tool and installs the raw dataset.
pub struct ExtractNode {
    tool: Arc<dyn ExtractTool>,
    timeout: Duration,
}

impl ExtractNode {
    /// Creates the node.
    #[must_use]
    pub fn new(tool: Arc<dyn ExtractTool>, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// Extracts the dataset named by the state's source handle.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let source = state.source.clone();
        let dataset = bounded(self.timeout, self.tool.extract(&source), |d| {
            NodeError::Extraction(format!("extract timed out after {:.1}s", d.as_secs_f64()))
        })
        .await?;

        let rows = dataset.row_count();
        let columns = dataset.column_count();
        info!(rows, columns, source = %source, "extracted dataset");

        state.log_success(
            Stage::Extract,
            format!("extracted {rows} rows, {columns} columns from '{source}'"),
            HashMap::from([
                ("rows".to_string(), json!(rows)),
                ("columns".to_string(), json!(columns)),
            ]),
        );
        state.raw_dataset = Some(dataset);
        Ok(())
    }
}
