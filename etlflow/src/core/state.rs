//! Pipeline state: the single source of truth for one run.

use super::{
    ExecutionLog, Metrics, SchemaSummary, Stage, StepRecord, TransformationPlan, ValidationRule,
};
use crate::dataset::Dataset;
use crate::errors::NodeError;
use serde::Serialize;
use uuid::Uuid;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    /// The run is still in flight.
    Pending,
    /// The run completed and verification passed.
    Success,
    /// The run terminated without completing.
    Failed,
}

impl FinalStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// The current unresolved failure, present only on the error-handler path.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// The stage the failure originated in.
    pub stage: Stage,
    /// Taxonomy category ("TransformationError", "LoadError", ...).
    pub category: String,
    /// What went wrong.
    pub message: String,
    /// A small sample of the offending data, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<serde_json::Value>,
}

impl ErrorRecord {
    /// Captures a node error with its originating stage.
    #[must_use]
    pub fn from_error(stage: Stage, error: &NodeError) -> Self {
        Self {
            stage,
            category: error.category().to_string(),
            message: error.to_string(),
            sample: error.sample().cloned(),
        }
    }

    /// One-line summary for reports.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} at {}: {}", self.category, self.stage, self.message)
    }
}

/// The mutable record threaded through every node for one run.
///
/// Owned exclusively by the orchestrator; nodes receive it mutably one at a
/// time, so there is no concurrent mutation within a run.
#[derive(Debug, Serialize)]
pub struct PipelineState {
    /// Run identity.
    pub run_id: Uuid,
    /// Source handle for the extract tool.
    pub source: String,
    /// Target identifier for the load tool.
    pub target: String,
    /// Caller-supplied natural-language intent.
    pub intent: String,
    /// The working dataset. Mutated in place by Transform; after a mid-plan
    /// failure it reflects partial application, and recovery plans operate
    /// on that partial state.
    pub raw_dataset: Option<Dataset>,
    /// Produced once by Analyze; read by Plan, Validate, and recovery.
    pub schema_summary: Option<SchemaSummary>,
    /// The current plan; replaced wholesale by recovery.
    pub transformation_plan: Option<TransformationPlan>,
    /// Rules synthesized by the oracle during Validate.
    pub validation_rules: Vec<ValidationRule>,
    /// Append-only audit trail.
    pub execution_log: ExecutionLog,
    /// Present only while a failure awaits recovery.
    pub error_record: Option<ErrorRecord>,
    /// Recovery attempts consumed so far.
    pub retry_count: u32,
    /// Row count reported by the load tool.
    pub rows_loaded: Option<u64>,
    /// Terminal once set.
    pub final_status: FinalStatus,
}

impl PipelineState {
    /// Creates the state for a new run.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            target: target.into(),
            intent: intent.into(),
            raw_dataset: None,
            schema_summary: None,
            transformation_plan: None,
            validation_rules: Vec::new(),
            execution_log: ExecutionLog::new(),
            error_record: None,
            retry_count: 0,
            rows_loaded: None,
            final_status: FinalStatus::Pending,
        }
    }

    /// Appends a success record.
    pub fn log_success(&mut self, stage: Stage, message: impl Into<String>, metrics: Metrics) {
        let mut record = StepRecord::success(stage, message);
        record.metrics = metrics;
        self.execution_log.append(record);
    }

    /// Appends a failure record.
    pub fn log_failure(&mut self, stage: Stage, message: impl Into<String>) {
        self.execution_log.append(StepRecord::failure(stage, message));
    }

    /// Captures an unresolved failure for the error handler.
    pub fn set_error(&mut self, record: ErrorRecord) {
        self.error_record = Some(record);
    }

    /// Clears the failure after a successful recovery.
    pub fn clear_error(&mut self) {
        self.error_record = None;
    }

    /// Marks the run terminal. The first terminal status wins; later calls
    /// are ignored so no node can mutate a finished run's outcome.
    pub fn mark_final(&mut self, status: FinalStatus) {
        if self.final_status == FinalStatus::Pending {
            self.final_status = status;
        }
    }
}

/// The caller-facing view of a terminal run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Run identity.
    pub run_id: Uuid,
    /// Terminal status; never `PENDING`.
    pub final_status: FinalStatus,
    /// The full audit trail, including every retried attempt.
    pub execution_log: ExecutionLog,
    /// Rows loaded, when the run reached Load.
    pub rows_loaded: Option<u64>,
    /// Recovery attempts consumed.
    pub retry_count: u32,
    /// One-line description of the terminal failure, on FAILED runs.
    pub error_summary: Option<String>,
}

impl From<PipelineState> for RunReport {
    fn from(state: PipelineState) -> Self {
        Self {
            run_id: state.run_id,
            final_status: state.final_status,
            rows_loaded: state.rows_loaded,
            retry_count: state.retry_count,
            error_summary: state.error_record.as_ref().map(ErrorRecord::summary),
            execution_log: state.execution_log,
        }
    }
}
