//! Step records and the append-only execution log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-step metrics attached to a record (row counts, durations, kinds).
pub type Metrics = HashMap<String, Value>;

/// The pipeline stage a record or error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Data extraction from the source.
    Extract,
    /// Schema profiling and oracle interpretation.
    Analyze,
    /// Transformation planning.
    Plan,
    /// Plan execution against the dataset.
    Transform,
    /// Rule synthesis and evaluation.
    Validate,
    /// Handing the dataset to the sink.
    Load,
    /// Post-load verification.
    Verify,
    /// Oracle-guided error recovery.
    Recovery,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Extract => "extract",
            Self::Analyze => "analyze",
            Self::Plan => "plan",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Load => "load",
            Self::Verify => "verify",
            Self::Recovery => "recovery",
        };
        f.write_str(name)
    }
}

/// Outcome of one recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step completed.
    Success,
    /// The step failed; the message carries the error category and detail.
    Failure,
}

/// One entry in the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Originating stage.
    pub stage: Stage,
    /// Success or failure.
    pub status: StepStatus,
    /// Human-readable description of what happened.
    pub message: String,
    /// Step metrics (rows affected, action kinds, attempt numbers).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metrics: Metrics,
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    /// Creates a success record.
    #[must_use]
    pub fn success(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Success,
            message: message.into(),
            metrics: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a failure record.
    #[must_use]
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Failure,
            message: message.into(),
            metrics: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attaches a metric.
    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Whether this record reports a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failure
    }
}

/// Append-only, ordered record of per-step outcomes.
///
/// The log survives retries untouched: it is the audit trail handed to the
/// oracle during recovery and returned to the caller whatever the outcome.
/// There is deliberately no API to remove or edit an entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionLog {
    records: Vec<StepRecord>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn append(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// All records in append order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// The last `n` records, used as oracle context.
    #[must_use]
    pub fn tail(&self, n: usize) -> &[StepRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of failure records.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }
}
