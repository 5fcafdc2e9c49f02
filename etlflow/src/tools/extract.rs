//! Data extraction seam.

use crate::dataset::Dataset;
use crate::errors::{EtlError, NodeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Produces a dataset from a source handle.
///
/// File-format parsing and connection handling live behind this trait;
/// the pipeline only sees the resulting dataset.
#[async_trait]
pub trait ExtractTool: Send + Sync {
    /// Extracts the dataset identified by `source`.
    async fn extract(&self, source: &str) -> Result<Dataset, NodeError>;
}

/// Reference extract tool over registered in-memory JSON record tables.
#[derive(Debug, Default)]
pub struct JsonRecordsSource {
    tables: Mutex<HashMap<String, Vec<serde_json::Map<String, Value>>>>,
}

impl JsonRecordsSource {
    /// Creates an empty source registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under a source name.
    ///
    /// `records` must be a JSON array of objects.
    pub fn register(&self, source: impl Into<String>, records: &Value) -> Result<(), EtlError> {
        let rows = records
            .as_array()
            .ok_or_else(|| EtlError::InvalidRequest("records must be a JSON array".into()))?
            .iter()
            .map(|entry| {
                entry
                    .as_object()
                    .cloned()
                    .ok_or_else(|| EtlError::InvalidRequest("records must be objects".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.tables.lock().insert(source.into(), rows);
        Ok(())
    }

    /// Builder form of [`Self::register`].
    pub fn with_table(self, source: impl Into<String>, records: &Value) -> Result<Self, EtlError> {
        self.register(source, records)?;
        Ok(self)
    }
}

#[async_trait]
impl ExtractTool for JsonRecordsSource {
    async fn extract(&self, source: &str) -> Result<Dataset, NodeError> {
        let tables = self.tables.lock();
        let records = tables
            .get(source)
            .ok_or_else(|| NodeError::Extraction(format!("unknown source '{source}'")))?;

        Ok(Dataset::from_records(records))
    }
}
