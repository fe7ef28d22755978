//! Flat, column-ordered result table handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rows of JSON values under a fixed column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at `row` for `column`, if both exist
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All values of one column, top to bottom
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Rows as JSON objects, one per row
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}
