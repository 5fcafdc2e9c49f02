//! Transformation actions and plans.
//!
//! The oracle proposes plans as JSON; everything here treats that JSON as
//! untrusted input. An action kind outside the closed vocabulary is rejected
//! at parse time and never reaches execution.

use crate::errors::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed vocabulary of transformation actions.
///
/// Kinds serialize as snake_case strings, matching the wire form the oracle
/// is instructed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Coerce a column to datetime; unparseable cells become null.
    ConvertDatetime,
    /// Fill null cells using a strategy (value/mean/median/mode/drop).
    FillNull,
    /// Remove rows with negative values in a numeric column.
    RemoveNegative,
    /// Remove rows whose value is outside an allowed set.
    RemoveInvalid,
    /// Coerce a column to numeric; unparseable cells become null.
    ConvertNumeric,
    /// Rename a column.
    RenameColumn,
    /// Drop a column.
    DropColumn,
    /// Normalize text case in a column.
    StandardizeText,
    /// Remove duplicate rows, optionally keyed on a column subset.
    RemoveDuplicates,
}

impl ActionKind {
    /// All allow-listed kinds.
    pub const ALL: [Self; 9] = [
        Self::ConvertDatetime,
        Self::FillNull,
        Self::RemoveNegative,
        Self::RemoveInvalid,
        Self::ConvertNumeric,
        Self::RenameColumn,
        Self::DropColumn,
        Self::StandardizeText,
        Self::RemoveDuplicates,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConvertDatetime => "convert_datetime",
            Self::FillNull => "fill_null",
            Self::RemoveNegative => "remove_negative",
            Self::RemoveInvalid => "remove_invalid",
            Self::ConvertNumeric => "convert_numeric",
            Self::RenameColumn => "rename_column",
            Self::DropColumn => "drop_column",
            Self::StandardizeText => "standardize_text",
            Self::RemoveDuplicates => "remove_duplicates",
        }
    }

    /// Looks a wire name up in the allow-list.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transformation instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    /// The allow-listed kind.
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// The column the action targets, when it targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Kind-specific parameters (strategy, valid_values, new_name, ...).
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl Action {
    /// Creates an action with no column or parameters.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            column: None,
            params: serde_json::Map::new(),
        }
    }

    /// Sets the target column.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Parses one plan entry from untrusted JSON.
    ///
    /// Structural junk (non-object entries, missing tag) is an
    /// [`NodeError::Oracle`]; a well-formed entry with a kind outside the
    /// allow-list is a [`NodeError::Planning`].
    pub fn from_value(value: &Value) -> Result<Self, NodeError> {
        let entry = value
            .as_object()
            .ok_or_else(|| NodeError::Oracle("plan entry is not an object".into()))?;

        let name = entry
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Oracle("plan entry is missing an 'action' tag".into()))?;

        let kind = ActionKind::parse(name)
            .ok_or_else(|| NodeError::Planning(format!("unknown action kind '{name}'")))?;

        let column = match entry.get("column") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(NodeError::Planning(format!(
                    "'column' must be a string, got {other}"
                )))
            }
        };

        let params = entry
            .iter()
            .filter(|(key, _)| key.as_str() != "action" && key.as_str() != "column")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            kind,
            column,
            params,
        })
    }

    /// A string parameter.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// A numeric parameter.
    #[must_use]
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    /// An array parameter.
    #[must_use]
    pub fn param_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.params.get(key).and_then(Value::as_array)
    }
}

/// An ordered sequence of actions. Order is significant: actions apply
/// sequentially and later actions see the effects of earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformationPlan(Vec<Action>);

impl TransformationPlan {
    /// Creates a plan from already-validated actions.
    #[must_use]
    pub fn new(actions: Vec<Action>) -> Self {
        Self(actions)
    }

    /// Parses a full plan from untrusted JSON.
    ///
    /// Accepts either a bare array or an object wrapping one under `"plan"`,
    /// which is how oracle replies arrive in practice.
    pub fn from_value(value: &Value) -> Result<Self, NodeError> {
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(map) => map
                .get("plan")
                .and_then(Value::as_array)
                .ok_or_else(|| NodeError::Oracle("plan response has no 'plan' array".into()))?,
            _ => return Err(NodeError::Oracle("plan response is not an array".into())),
        };

        let actions = entries
            .iter()
            .map(Action::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(actions))
    }

    /// The actions in application order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.0
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the plan has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The kind names in order, for log metrics.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.0.iter().map(|a| a.kind.as_str()).collect()
    }
}
