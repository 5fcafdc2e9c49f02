//! In-memory tabular data handle.
//!
//! A [`Dataset`] is the unit of data that flows through a pipeline run:
//! extracted by the extract tool, mutated in place by plan actions, read by
//! validation rules, and handed to the load tool. Cells are
//! `serde_json::Value`s so heterogeneous and dirty data survive extraction
//! unchanged; typing is applied later by plan actions.

mod stats;

pub use stats::{cell_f64, mean, median, mode};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A column-ordered table of JSON cells.
///
/// Row ownership is exclusive: the dataset is owned by the pipeline state
/// and only the currently executing node mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Creates an empty dataset with the given column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset from a sequence of JSON records.
    ///
    /// The column set is the union of all record keys; keys absent from a
    /// record become null cells.
    #[must_use]
    pub fn from_records(records: &[serde_json::Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Builds a dataset from named columns of equal length.
    ///
    /// # Panics
    ///
    /// Panics if the columns have differing lengths.
    #[must_use]
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> Self {
        let names: Vec<String> = columns.iter().map(|(n, _)| (*n).to_string()).collect();
        let len = columns.first().map_or(0, |(_, v)| v.len());
        for (name, values) in &columns {
            assert_eq!(values.len(), len, "ragged column '{name}'");
        }

        let mut rows = vec![Vec::with_capacity(names.len()); len];
        for (_, values) in columns {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }

        Self {
            columns: names,
            rows,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Index of a named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a named column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// The cell at (row, column index).
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// All values of one column, in row order.
    #[must_use]
    pub fn values(&self, column: usize) -> Vec<&Value> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }

    /// Count of null cells in a column.
    #[must_use]
    pub fn null_count(&self, column: usize) -> usize {
        self.rows
            .iter()
            .filter(|r| r.get(column).map_or(true, Value::is_null))
            .count()
    }

    /// Count of distinct non-null values in a column (by JSON encoding).
    #[must_use]
    pub fn distinct_count(&self, column: usize) -> usize {
        let mut seen = HashSet::new();
        for row in &self.rows {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    seen.insert(value.to_string());
                }
            }
        }
        seen.len()
    }

    /// Appends a row.
    ///
    /// # Panics
    ///
    /// Panics if the row length does not match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    /// Replaces every cell of a column through `f`.
    pub fn map_column(&mut self, column: usize, mut f: impl FnMut(&Value) -> Value) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = f(cell);
            }
        }
    }

    /// Keeps only the rows for which `keep` returns true; returns the number
    /// of rows removed.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Renames a column in place.
    pub fn rename_column(&mut self, column: usize, new_name: impl Into<String>) {
        if let Some(name) = self.columns.get_mut(column) {
            *name = new_name.into();
        }
    }

    /// Removes a column and its cells from every row.
    pub fn drop_column(&mut self, column: usize) {
        if column < self.columns.len() {
            self.columns.remove(column);
            for row in &mut self.rows {
                if column < row.len() {
                    row.remove(column);
                }
            }
        }
    }

    /// Removes duplicate rows, keeping the first occurrence.
    ///
    /// When `subset` is given, only those columns participate in the
    /// duplicate key; otherwise the whole row does. Returns the number of
    /// rows removed.
    pub fn dedup_rows(&mut self, subset: Option<&[usize]>) -> usize {
        let mut seen = HashSet::new();
        self.retain_rows(|row| {
            let key = match subset {
                Some(indices) => indices
                    .iter()
                    .filter_map(|&i| row.get(i))
                    .map(std::string::ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\u{1f}"),
                None => row
                    .iter()
                    .map(std::string::ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\u{1f}"),
            };
            seen.insert(key)
        })
    }

    /// The first `limit` rows as JSON records.
    #[must_use]
    pub fn sample_records(&self, limit: usize) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// All rows as JSON records.
    #[must_use]
    pub fn to_records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.sample_records(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn small() -> Dataset {
        Dataset::from_columns(vec![
            ("id", vec![json!(1), json!(2), json!(3)]),
            ("name", vec![json!("a"), Value::Null, json!("a")]),
        ])
    }

    #[test]
    fn test_from_records_unions_keys() {
        let records: Vec<serde_json::Map<String, Value>> = vec![
            serde_json::from_value(json!({"a": 1, "b": 2})).unwrap(),
            serde_json::from_value(json!({"a": 3, "c": 4})).unwrap(),
        ];

        let ds = Dataset::from_records(&records);
        assert_eq!(ds.column_count(), 3);
        assert_eq!(ds.row_count(), 2);

        let c = ds.column_index("c").unwrap();
        assert_eq!(ds.cell(0, c), Some(&Value::Null));
        assert_eq!(ds.cell(1, c), Some(&json!(4)));
    }

    #[test]
    fn test_counts_and_lookup() {
        let ds = small();
        assert_eq!(ds.row_count(), 3);
        assert!(ds.has_column("name"));
        assert!(!ds.has_column("missing"));

        let name = ds.column_index("name").unwrap();
        assert_eq!(ds.null_count(name), 1);
        assert_eq!(ds.distinct_count(name), 1);
    }

    #[test]
    fn test_retain_rows_reports_removed() {
        let mut ds = small();
        let id = ds.column_index("id").unwrap();
        let removed = ds.retain_rows(|row| row[id] != json!(2));

        assert_eq!(removed, 1);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn test_map_column() {
        let mut ds = small();
        let id = ds.column_index("id").unwrap();
        ds.map_column(id, |v| json!(cell_f64(v).unwrap_or(0.0) * 10.0));

        assert_eq!(ds.cell(0, id), Some(&json!(10.0)));
    }

    #[test]
    fn test_rename_and_drop_column() {
        let mut ds = small();
        let name = ds.column_index("name").unwrap();
        ds.rename_column(name, "label");
        assert!(ds.has_column("label"));

        ds.drop_column(ds.column_index("label").unwrap());
        assert_eq!(ds.column_count(), 1);
        assert_eq!(ds.cell(0, 0), Some(&json!(1)));
    }

    #[test]
    fn test_dedup_rows_whole_and_subset() {
        let mut ds = Dataset::from_columns(vec![
            ("a", vec![json!(1), json!(1), json!(2)]),
            ("b", vec![json!("x"), json!("x"), json!("x")]),
        ]);
        assert_eq!(ds.clone().dedup_rows(None), 1);

        let a = ds.column_index("a").unwrap();
        let b = ds.column_index("b").unwrap();
        assert_eq!(ds.dedup_rows(Some(&[b])), 2);
        assert_eq!(ds.cell(0, a), Some(&json!(1)));
    }

    #[test]
    fn test_sample_records() {
        let ds = small();
        let sample = ds.sample_records(2);

        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].get("id"), Some(&json!(1)));
        assert_eq!(sample[1].get("name"), Some(&Value::Null));
    }
}
