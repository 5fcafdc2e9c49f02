//! The reasoning oracle seam.
//!
//! The oracle converts structured context into structured decisions: schema
//! interpretations, transformation plans, validation rules, and recovery
//! plans. It is nondeterministic and fallible, so its output is never
//! trusted blindly - every reply is parsed against the closed action/rule
//! vocabularies before it touches pipeline state.

mod config;
#[cfg(feature = "http")]
mod http;

pub use config::OracleConfig;
#[cfg(feature = "http")]
pub use http::HttpOracle;

use crate::core::{
    DataProfile, ErrorRecord, SchemaSummary, StepRecord, TransformationPlan, ValidationRule,
};
use crate::errors::NodeError;
use async_trait::async_trait;

/// External reasoning capability invoked by the pipeline nodes.
///
/// Implementations must be safe for concurrent independent invocation:
/// multiple runs may share one oracle, each with its own pipeline state.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Interprets a structural profile into a schema summary.
    async fn analyze(&self, profile: &DataProfile) -> Result<SchemaSummary, NodeError>;

    /// Produces an ordered transformation plan for the given schema and
    /// caller intent. The log tail provides context on repeated runs.
    async fn plan(
        &self,
        schema: &SchemaSummary,
        intent: &str,
        log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError>;

    /// Synthesizes validation rules appropriate to the observed data.
    async fn synthesize_rules(
        &self,
        schema: &SchemaSummary,
        sample: &[serde_json::Map<String, serde_json::Value>],
    ) -> Result<Vec<ValidationRule>, NodeError>;

    /// Produces a corrected plan from a failure context.
    async fn recover(
        &self,
        error: &ErrorRecord,
        schema: &SchemaSummary,
        log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError>;
}
