//! Error types for the etlflow pipeline controller.
//!
//! Expected failures during a run never escape [`crate::pipeline::Orchestrator::run`];
//! they are folded into the returned pipeline state via the error handler.
//! The types here classify those failures and the few genuine misuse errors
//! that do surface to the caller.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the caller-facing API for programmer-caused misuse.
///
/// Everything else - tool failures, oracle failures, validation failures -
/// is an expected outcome and is reported through the execution log and
/// final status instead.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The run request was malformed (e.g. an empty source handle).
    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    /// An adapter could not be constructed from its configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A failure produced by one pipeline node.
///
/// Variants mirror the stages that can produce them. Whether a failure is
/// recoverable is decided by the node it occurred in, not by the variant:
/// anything raised before a transformation plan exists is fatal.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// The extract tool could not produce a dataset.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Schema analysis failed before a plan could be formed.
    #[error("schema analysis failed: {0}")]
    Analysis(String),

    /// The oracle was unreachable or returned non-conforming output.
    #[error("oracle request failed: {0}")]
    Oracle(String),

    /// A returned plan was rejected (unknown action kind, bad structure).
    #[error("plan rejected: {0}")]
    Planning(String),

    /// A plan action hit a data-level error mid-execution.
    #[error("action {index} ({action}) failed: {message}")]
    Transformation {
        /// 1-based position of the failing action in the plan.
        index: usize,
        /// The action kind that failed.
        action: String,
        /// What went wrong.
        message: String,
        /// A small sample of the rows the action was operating on.
        sample: Option<Value>,
    },

    /// A synthesized validation rule did not hold.
    #[error("rule '{rule}' failed: {detail}")]
    Validation {
        /// Description of the failing rule.
        rule: String,
        /// Evaluation detail (counts, offending values).
        detail: String,
    },

    /// The load tool rejected the dataset or lost connectivity.
    #[error("load failed: {0}")]
    Load(String),

    /// Post-load verification found a mismatch at the sink.
    #[error("verification failed: {0}")]
    Verify(String),
}

impl NodeError {
    /// The taxonomy name used in log records and error summaries.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "ExtractionError",
            Self::Analysis(_) => "AnalysisError",
            Self::Oracle(_) => "OracleError",
            Self::Planning(_) => "PlanningError",
            Self::Transformation { .. } => "TransformationError",
            Self::Validation { .. } => "ValidationFailure",
            Self::Load(_) => "LoadError",
            Self::Verify(_) => "VerifyError",
        }
    }

    /// The offending-data sample carried by the error, if any.
    #[must_use]
    pub fn sample(&self) -> Option<&Value> {
        match self {
            Self::Transformation { sample, .. } => sample.as_ref(),
            _ => None,
        }
    }
}
