//! Query-related data models.
//!
//! This module defines types for executed statement results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-specific type (e.g., "int8", "varchar", "TEXT")
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Tabular result of a successfully executed statement.
///
/// Columns come 1:1 from the statement's result-set metadata. Each row holds
/// one value per column, by position, so duplicate column names (common in
/// joins) keep their own values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<JsonValue>>,
    /// More rows existed than the row limit allowed
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a result with no columns and no rows.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in result-set order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Value of the first column called `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&JsonValue> {
        let idx = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(row)?.get(idx)
    }
}
