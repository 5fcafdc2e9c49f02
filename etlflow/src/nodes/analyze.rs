//! Analyze node: profiles the dataset and asks the oracle to interpret it.

use super::bounded;
use crate::core::{DataProfile, PipelineState, Stage};
use crate::errors::NodeError;
use crate::oracle::Oracle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds a structural profile and obtains the schema summary.
///
/// Failure here is fatal for the run: no plan exists yet, so there is no
/// recovery context.
pub struct AnalyzeNode {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl AnalyzeNode {
    /// Creates the node.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Profiles the raw dataset and stores the oracle's schema summary.
    pub async fn execute(&self, state: &mut PipelineState) -> Result<(), NodeError> {
        let dataset = state
            .raw_dataset
            .as_ref()
            .ok_or_else(|| NodeError::Analysis("no dataset has been extracted".into()))?;

        let profile = DataProfile::of(dataset);
        let anomalies = profile.anomaly_count();

        let summary = bounded(self.timeout, self.oracle.analyze(&profile), |d| {
            NodeError::Analysis(format!("oracle analysis timed out after {:.1}s", d.as_secs_f64()))
        })
        .await?;

        if summary.columns.is_empty() {
            return Err(NodeError::Analysis(
                "oracle returned a schema summary with no columns".into(),
            ));
        }

        info!(columns = summary.columns.len(), anomalies, "schema analyzed");

        state.log_success(
            Stage::Analyze,
            format!(
                "analyzed {} columns, {anomalies} data quality issues found",
                summary.columns.len()
            ),
            HashMap::from([
                ("columns".to_string(), json!(summary.columns.len())),
                ("anomalies".to_string(), json!(anomalies)),
            ]),
        );
        state.schema_summary = Some(summary);
        Ok(())
    }
}
