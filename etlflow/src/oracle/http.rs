//! HTTP-backed oracle adapter.
//!
//! Requests are a JSON envelope `{model, op, payload}`; replies are parsed
//! strictly into the domain types. A reply that is not valid JSON, or that
//! fails vocabulary validation, surfaces as an error - it is never coerced.

use super::{Oracle, OracleConfig};
use crate::core::{
    DataProfile, ErrorRecord, SchemaSummary, StepRecord, TransformationPlan, ValidationRule,
};
use crate::errors::{EtlError, NodeError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    model: &'a str,
    op: &'a str,
    payload: T,
}

/// Oracle adapter over a JSON HTTP endpoint.
#[derive(Debug)]
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl HttpOracle {
    /// Builds the adapter from its configuration.
    pub fn new(config: OracleConfig) -> Result<Self, EtlError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EtlError::Configuration(format!("http client: {e}")))?;

        Ok(Self { config, client })
    }

    /// The configuration the adapter was built with.
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    async fn call<T: Serialize + Sync>(&self, op: &str, payload: T) -> Result<Value, NodeError> {
        let envelope = Envelope {
            model: &self.config.model,
            op,
            payload,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&envelope);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NodeError::Oracle(format!("{op}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::Oracle(format!(
                "{op}: endpoint returned status {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| NodeError::Oracle(format!("{op}: reply is not JSON: {e}")))
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn analyze(&self, profile: &DataProfile) -> Result<SchemaSummary, NodeError> {
        let reply = self
            .call("analyze", serde_json::json!({ "profile": profile }))
            .await?;

        serde_json::from_value(reply)
            .map_err(|e| NodeError::Oracle(format!("analyze: malformed schema summary: {e}")))
    }

    async fn plan(
        &self,
        schema: &SchemaSummary,
        intent: &str,
        log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        let reply = self
            .call(
                "plan",
                serde_json::json!({ "schema": schema, "intent": intent, "log": log }),
            )
            .await?;

        TransformationPlan::from_value(&reply)
    }

    async fn synthesize_rules(
        &self,
        schema: &SchemaSummary,
        sample: &[serde_json::Map<String, Value>],
    ) -> Result<Vec<ValidationRule>, NodeError> {
        let reply = self
            .call(
                "synthesize_rules",
                serde_json::json!({ "schema": schema, "sample": sample }),
            )
            .await?;

        let entries = match &reply {
            Value::Array(entries) => entries.as_slice(),
            Value::Object(map) => map
                .get("rules")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    NodeError::Oracle("synthesize_rules: reply has no 'rules' array".into())
                })?,
            _ => {
                return Err(NodeError::Oracle(
                    "synthesize_rules: reply is not an array".into(),
                ))
            }
        };

        entries.iter().map(ValidationRule::from_value).collect()
    }

    async fn recover(
        &self,
        error: &ErrorRecord,
        schema: &SchemaSummary,
        log: &[StepRecord],
    ) -> Result<TransformationPlan, NodeError> {
        let reply = self
            .call(
                "recover",
                serde_json::json!({ "error": error, "schema": schema, "log": log }),
            )
            .await?;

        TransformationPlan::from_value(&reply)
    }
}
