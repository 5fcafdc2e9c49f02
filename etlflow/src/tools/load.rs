//! Data loading seam.

use crate::dataset::Dataset;
use crate::errors::NodeError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Hands a dataset to a sink and reports what landed there.
///
/// Database drivers and sink schemas live behind this trait; the pipeline
/// only depends on a row count and a success or failure signal. Errors from
/// [`LoadTool::count`] are reported by the verify node as verification
/// failures.
#[async_trait]
pub trait LoadTool: Send + Sync {
    /// Loads the dataset into `target`, replacing any previous contents.
    /// Returns the number of rows loaded.
    async fn load(&self, dataset: &Dataset, target: &str) -> Result<u64, NodeError>;

    /// Reports the current row count at `target`.
    async fn count(&self, target: &str) -> Result<u64, NodeError>;
}

/// Reference sink that keeps loaded tables in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, Dataset>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of a loaded table, for inspection.
    #[must_use]
    pub fn table(&self, target: &str) -> Option<Dataset> {
        self.tables.lock().get(target).cloned()
    }
}

#[async_trait]
impl LoadTool for MemorySink {
    async fn load(&self, dataset: &Dataset, target: &str) -> Result<u64, NodeError> {
        let rows = dataset.row_count() as u64;
        self.tables.lock().insert(target.to_string(), dataset.clone());
        Ok(rows)
    }

    async fn count(&self, target: &str) -> Result<u64, NodeError> {
        self.tables
            .lock()
            .get(target)
            .map(|t| t.row_count() as u64)
            .ok_or_else(|| NodeError::Verify(format!("target '{target}' has no loaded table")))
    }
}
