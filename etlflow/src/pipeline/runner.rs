//! The orchestrator: owns the node graph, transition table, and retry
//! budget, and drives a run from EXTRACT to a terminal state.

use super::machine::Node;
use super::recovery::{ErrorHandler, Recovery};
use crate::cancellation::CancellationToken;
use crate::core::{ErrorRecord, FinalStatus, PipelineState, RunReport};
use crate::errors::{EtlError, NodeError};
use crate::nodes::{
    AnalyzeNode, ExtractNode, LoadNode, PlanNode, TransformNode, ValidateNode, VerifyNode,
};
use crate::oracle::Oracle;
use crate::tools::{ExtractTool, LoadTool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tuning knobs for a run, shared by every node.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Timeout applied to each oracle/tool invocation.
    pub step_timeout_seconds: f64,
    /// How many trailing log records are handed to the oracle as context.
    pub log_tail: usize,
    /// How many rows of the dataset are sampled for rule synthesis.
    pub sample_rows: usize,
    /// Permitted absolute row-count difference at verification.
    pub verify_tolerance: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: 60.0,
            log_tail: 20,
            sample_rows: 5,
            verify_tolerance: 0,
        }
    }
}

impl RunConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub fn with_step_timeout(mut self, seconds: f64) -> Self {
        self.step_timeout_seconds = seconds;
        self
    }

    /// Sets the verification tolerance.
    #[must_use]
    pub fn with_verify_tolerance(mut self, tolerance: u64) -> Self {
        self.verify_tolerance = tolerance;
        self
    }

    fn step_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.step_timeout_seconds)
    }
}

/// One pipeline run's inputs.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Source handle for the extract tool.
    pub source: String,
    /// Target identifier for the load tool.
    pub target: String,
    /// Natural-language instructions forwarded to the oracle.
    pub intent: String,
    /// Maximum oracle-guided re-plan cycles.
    pub max_retries: u32,
    /// Optional token checked at every transition.
    pub cancellation: Option<Arc<CancellationToken>>,
}

impl RunRequest {
    /// Creates a request with the default retry budget of 2.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            intent: intent.into(),
            max_retries: 2,
            cancellation: None,
        }
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn validate(&self) -> Result<(), EtlError> {
        if self.source.trim().is_empty() {
            return Err(EtlError::InvalidRequest("source handle is empty".into()));
        }
        if self.target.trim().is_empty() {
            return Err(EtlError::InvalidRequest("target identifier is empty".into()));
        }
        Ok(())
    }
}

/// Drives pipeline runs. One orchestrator can serve many concurrent runs;
/// each run owns its own state and only the adapters are shared.
pub struct Orchestrator {
    extract: ExtractNode,
    analyze: AnalyzeNode,
    plan: PlanNode,
    transform: TransformNode,
    validate: ValidateNode,
    load: LoadNode,
    verify: VerifyNode,
    handler: ErrorHandler,
}

impl Orchestrator {
    /// Wires the orchestrator from its adapters with default tuning.
    #[must_use]
    pub fn new(
        oracle: Arc<dyn Oracle>,
        extractor: Arc<dyn ExtractTool>,
        loader: Arc<dyn LoadTool>,
    ) -> Self {
        Self::with_config(oracle, extractor, loader, RunConfig::default())
    }

    /// Wires the orchestrator with explicit tuning.
    #[must_use]
    pub fn with_config(
        oracle: Arc<dyn Oracle>,
        extractor: Arc<dyn ExtractTool>,
        loader: Arc<dyn LoadTool>,
        config: RunConfig,
    ) -> Self {
        let timeout = config.step_timeout();
        Self {
            extract: ExtractNode::new(extractor, timeout),
            analyze: AnalyzeNode::new(oracle.clone(), timeout),
            plan: PlanNode::new(oracle.clone(), timeout, config.log_tail),
            transform: TransformNode::new(),
            validate: ValidateNode::new(oracle.clone(), timeout, config.sample_rows),
            load: LoadNode::new(loader.clone(), timeout),
            verify: VerifyNode::new(loader, timeout, config.verify_tolerance),
            handler: ErrorHandler::new(oracle, timeout, config.log_tail),
        }
    }

    /// Runs the pipeline to a terminal state.
    ///
    /// Expected failures - tool errors, validation failures, malformed
    /// oracle output - never surface as `Err`; they are resolved through
    /// the transition table and reported in the returned state. `Err` is
    /// reserved for misuse of the API itself.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, EtlError> {
        request.validate()?;

        let mut state = PipelineState::new(
            request.source.clone(),
            request.target.clone(),
            request.intent.clone(),
        );
        info!(run_id = %state.run_id, source = %state.source, "run started");

        let mut node = Node::Extract;
        while !node.is_terminal() {
            if let Some(token) = &request.cancellation {
                if token.is_cancelled() {
                    let reason = token.reason().unwrap_or_else(|| "cancelled".into());
                    warn!(run_id = %state.run_id, %reason, "run cancelled");
                    state.log_failure(
                        node.stage(),
                        format!("CancellationSignal: run aborted: {reason}"),
                    );
                    node = Node::Failed;
                    break;
                }
            }

            node = match node {
                Node::Extract => self.advance(node, self.extract.execute(&mut state).await, &mut state),
                Node::Analyze => self.advance(node, self.analyze.execute(&mut state).await, &mut state),
                Node::Plan => self.advance(node, self.plan.execute(&mut state).await, &mut state),
                Node::Transform => {
                    self.advance(node, self.transform.execute(&mut state).await, &mut state)
                }
                Node::Validate => {
                    self.advance(node, self.validate.execute(&mut state).await, &mut state)
                }
                Node::Load => self.advance(node, self.load.execute(&mut state).await, &mut state),
                Node::Verify => self.advance(node, self.verify.execute(&mut state).await, &mut state),
                Node::ErrorHandler => {
                    match self.handler.execute(&mut state, request.max_retries).await {
                        Recovery::Resume => Node::Transform,
                        Recovery::Exhausted => Node::Failed,
                    }
                }
                Node::Success | Node::Failed => node,
            };
        }

        let status = if node == Node::Success {
            FinalStatus::Success
        } else {
            FinalStatus::Failed
        };
        state.mark_final(status);
        info!(run_id = %state.run_id, status = %state.final_status, retries = state.retry_count, "run finished");

        Ok(RunReport::from(state))
    }

    /// Routes a node result through the transition table.
    fn advance(
        &self,
        node: Node,
        result: Result<(), NodeError>,
        state: &mut PipelineState,
    ) -> Node {
        match result {
            Ok(()) => node.on_success(),
            Err(error) => {
                warn!(node = %node, category = error.category(), "node failed");
                state.log_failure(node.stage(), format!("{}: {error}", error.category()));
                state.set_error(ErrorRecord::from_error(node.stage(), &error));

                if node.recovers_failures() {
                    Node::ErrorHandler
                } else {
                    Node::Failed
                }
            }
        }
    }
}
