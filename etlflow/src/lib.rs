//! # Etlflow
//!
//! A self-correcting ETL pipeline controller.
//!
//! Etlflow sequences Extract, Analyze, Plan, Transform, Validate, Load, and
//! Verify over tabular data, delegating the semantic decisions - schema
//! interpretation, transformation planning, rule synthesis, and recovery
//! re-planning - to an external reasoning oracle, while a bounded retry
//! budget keeps the loop finite:
//!
//! - **Orchestrated state machine**: one run is a strict sequence of node
//!   executions with an explicit transition table
//! - **Untrusted oracle output**: plans and rules parse against closed
//!   vocabularies before anything executes
//! - **Oracle-guided recovery**: post-plan failures re-plan through the
//!   oracle, bounded by `max_retries`
//! - **Append-only audit trail**: every step lands in the execution log,
//!   which is returned to the caller whatever the outcome
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use etlflow::prelude::*;
//! use std::sync::Arc;
//!
//! let orchestrator = Orchestrator::new(oracle, extractor, loader);
//! let report = orchestrator
//!     .run(RunRequest::new("trips.json", "trips", "clean the taxi data"))
//!     .await?;
//!
//! assert!(report.final_status.is_terminal());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod cancellation;
pub mod core;
pub mod dataset;
pub mod errors;
pub mod nodes;
pub mod observability;
pub mod oracle;
pub mod pipeline;
pub mod testing;
pub mod tools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::core::{
        Action, ActionKind, DataProfile, ErrorRecord, ExecutionLog, FinalStatus, PipelineState,
        PredicateKind, RunReport, SchemaSummary, Stage, StepRecord, StepStatus,
        TransformationPlan, ValidationRule,
    };
    pub use crate::dataset::Dataset;
    pub use crate::errors::{EtlError, NodeError};
    pub use crate::oracle::{Oracle, OracleConfig};
    pub use crate::pipeline::{Orchestrator, RunConfig, RunRequest};
    pub use crate::tools::{ExtractTool, JsonRecordsSource, LoadTool, MemorySink};

    #[cfg(feature = "http")]
    pub use crate::oracle::HttpOracle;
}
