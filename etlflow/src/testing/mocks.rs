//! Mock adapters that record calls and return scripted results.

use crate::core::{
    DataProfile, ErrorRecord, SchemaSummary, StepRecord, TransformationPlan, ValidationRule,
};
use crate::dataset::Dataset;
use crate::errors::NodeError;
use crate::oracle::Oracle;
use crate::tools::{ExtractTool, LoadTool, MemorySink};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

type Scripted<T> = Mutex<VecDeque<Result<T, NodeError>>>;

/// An oracle that replays queued responses per operation.
///
/// Unqueued operations fall back to deterministic defaults: analysis
/// echoes the profile, planning returns an empty plan, rule synthesis
/// returns no rules, and recovery fails - recovery should always be
/// scripted explicitly.
#[derive(Default)]
pub struct ScriptedOracle {
    analyses: Scripted<SchemaSummary>,
    plans: Scripted<TransformationPlan>,
    rules: Scripted<Vec<ValidationRule>>,
    recoveries: Scripted<TransformationPlan>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl ScriptedOracle {
    /// Creates an oracle with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an analysis response.
    pub fn push_analysis(&self, result: Result<SchemaSummary, NodeError>) {
        self.analyses.lock().push_back(result);
    }

    /// Queues a plan response.
    pub fn push_plan(&self, result: Result<TransformationPlan, NodeError>) {
        self.plans.lock().push_back(result);
    }

    /// Queues a plan reply as raw JSON, exercising the untrusted-input
    /// parsing path.
    pub fn push_plan_json(&self, reply: &Value) {
        self.plans.lock().push_back(TransformationPlan::from_value(reply));
    }

    /// Queues a rule-synthesis response.
    pub fn push_rules(&self, result: Result<Vec<ValidationRule>, NodeError>) {
        self.rules.lock().push_back(result);
    }

    /// Queues a recovery response.
    pub fn push_recovery(&self, result: Result<TransformationPlan, NodeError>) {
        self.recoveries.lock().push_back(result);
    }

    /// Queues a recovery reply as raw JSON.
    pub fn push_recovery_json(&self, reply: &Value) {
        self.recoveries
            .lock()
            .push_back(TransformationPlan::from_value(reply));
    }

    /// How many times an operation was invoked.
    #[must_use]
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        *self.calls.lock().entry(op).or_insert(0) += 1;
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn analyze(&self, profile: &DataProfile) -> Result<SchemaSummary, NodeError> {
        self.record("analyze");
        self.analyses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SchemaSummary::from_profile(profile.clone())))
    }

    async fn plan(
        &self,
        _schema: &SchemaSummary,
        _intent: &str,
        _log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        self.record("plan");
        self.plans
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(TransformationPlan::default()))
    }

    async fn synthesize_rules(
        &self,
        _schema: &SchemaSummary,
        _sample: &[serde_json::Map<String, Value>],
    ) -> Result<Vec<ValidationRule>, NodeError> {
        self.record("synthesize_rules");
        self.rules.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn recover(
        &self,
        _error: &ErrorRecord,
        _schema: &SchemaSummary,
        _log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        self.record("recover");
        self.recoveries
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(NodeError::Oracle("no scripted recovery available".into())))
    }
}

/// An oracle whose every operation stalls, for timeout tests.
#[derive(Debug)]
pub struct StallingOracle {
    delay: Duration,
}

impl StallingOracle {
    /// Creates an oracle that sleeps `delay` before failing.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn stall<T>(&self) -> Result<T, NodeError> {
        tokio::time::sleep(self.delay).await;
        Err(NodeError::Oracle("stalled".into()))
    }
}

#[async_trait]
impl Oracle for StallingOracle {
    async fn analyze(&self, _profile: &DataProfile) -> Result<SchemaSummary, NodeError> {
        self.stall().await
    }

    async fn plan(
        &self,
        _schema: &SchemaSummary,
        _intent: &str,
        _log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        self.stall().await
    }

    async fn synthesize_rules(
        &self,
        _schema: &SchemaSummary,
        _sample: &[serde_json::Map<String, Value>],
    ) -> Result<Vec<ValidationRule>, NodeError> {
        self.stall().await
    }

    async fn recover(
        &self,
        _error: &ErrorRecord,
        _schema: &SchemaSummary,
        _log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        self.stall().await
    }
}

/// An extract tool that always fails.
#[derive(Debug)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    /// Creates the source with a failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ExtractTool for FailingSource {
    async fn extract(&self, _source: &str) -> Result<Dataset, NodeError> {
        Err(NodeError::Extraction(self.message.clone()))
    }
}

/// A load tool that always fails.
#[derive(Debug)]
pub struct FailingSink {
    message: String,
}

impl FailingSink {
    /// Creates the sink with a failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LoadTool for FailingSink {
    async fn load(&self, _dataset: &Dataset, _target: &str) -> Result<u64, NodeError> {
        Err(NodeError::Load(self.message.clone()))
    }

    async fn count(&self, _target: &str) -> Result<u64, NodeError> {
        Err(NodeError::Load(self.message.clone()))
    }
}

/// A sink that fails the first `failures` loads, then behaves normally.
#[derive(Debug, Default)]
pub struct FlakySink {
    failures_remaining: Mutex<u32>,
    inner: MemorySink,
}

impl FlakySink {
    /// Creates a sink that fails the first `failures` load attempts.
    #[must_use]
    pub fn new(failures: u32) -> Self {
        Self {
            failures_remaining: Mutex::new(failures),
            inner: MemorySink::new(),
        }
    }
}

#[async_trait]
impl LoadTool for FlakySink {
    async fn load(&self, dataset: &Dataset, target: &str) -> Result<u64, NodeError> {
        {
            let mut remaining = self.failures_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NodeError::Load("transient sink failure".into()));
            }
        }
        self.inner.load(dataset, target).await
    }

    async fn count(&self, target: &str) -> Result<u64, NodeError> {
        self.inner.count(target).await
    }
}

/// A sink whose reported count is skewed, for verification-failure tests.
#[derive(Debug, Default)]
pub struct SkewedSink {
    skew: u64,
    inner: MemorySink,
}

impl SkewedSink {
    /// Creates a sink that over-reports its count by `skew`.
    #[must_use]
    pub fn new(skew: u64) -> Self {
        Self {
            skew,
            inner: MemorySink::new(),
        }
    }
}

#[async_trait]
impl LoadTool for SkewedSink {
    async fn load(&self, dataset: &Dataset, target: &str) -> Result<u64, NodeError> {
        self.inner.load(dataset, target).await
    }

    async fn count(&self, target: &str) -> Result<u64, NodeError> {
        Ok(self.inner.count(target).await? + self.skew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_scripted_oracle_defaults_and_counts() {
        let oracle = ScriptedOracle::new();
        let ds = fixtures::taxi_dataset();
        let profile = DataProfile::of(&ds);

        let summary = oracle.analyze(&profile).await.unwrap();
        assert_eq!(summary.row_count, ds.row_count());

        let plan = oracle.plan(&summary, "clean", &[]).await.unwrap();
        assert!(plan.is_empty());

        assert_eq!(oracle.calls("analyze"), 1);
        assert_eq!(oracle.calls("plan"), 1);
        assert_eq!(oracle.calls("recover"), 0);
    }

    #[tokio::test]
    async fn test_scripted_responses_replay_in_order() {
        let oracle = ScriptedOracle::new();
        oracle.push_plan(Err(NodeError::Oracle("first".into())));
        oracle.push_plan(Ok(fixtures::cleanup_plan()));

        let schema = fixtures::schema_for(&fixtures::taxi_dataset());
        assert!(oracle.plan(&schema, "i", &[]).await.is_err());
        assert_eq!(oracle.plan(&schema, "i", &[]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_flaky_sink_recovers() {
        let sink = FlakySink::new(1);
        let ds = fixtures::taxi_dataset();

        assert!(sink.load(&ds, "t").await.is_err());
        assert_eq!(sink.load(&ds, "t").await.unwrap(), 4);
        assert_eq!(sink.count("t").await.unwrap(), 4);
    }
}
