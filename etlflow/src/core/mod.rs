//! Core domain model for pipeline runs.
//!
//! This module contains the types threaded through every node:
//! - Transformation actions and plans (allow-listed vocabulary)
//! - Validation rules and their evaluation
//! - Schema profiles and summaries
//! - Step records and the append-only execution log
//! - The pipeline state record itself

mod action;
mod record;
mod rule;
mod schema;
mod state;

pub(crate) use schema::parse_datetime;

pub use action::{Action, ActionKind, TransformationPlan};
pub use record::{ExecutionLog, Metrics, Stage, StepRecord, StepStatus};
pub use rule::{PredicateKind, RuleOutcome, ValidationRule};
pub use schema::{Anomaly, ColumnProfile, ColumnType, DataProfile, SchemaSummary};
pub use state::{ErrorRecord, FinalStatus, PipelineState, RunReport};
