//! Query-related data models.
//!
//! This module defines the tabular result set returned by the database and
//! held as the conversation's last result.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Column metadata for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-reported type name (e.g., "INTEGER", "varchar")
    pub type_name: String,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Tabular result of one SQL execution: ordered columns and positional rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnMetadata>,
    /// Each row holds one value per column, in column order.
    pub rows: Vec<Vec<JsonValue>>,
    pub execution_time_ms: u64,
    /// True if more rows were available than the row limit allowed
    pub truncated: bool,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMetadata>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
            truncated: false,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flatten every row into a comma-joined line of stringified values.
    pub fn flatten_rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect()
    }
}

/// Render a single cell for display.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Numeric view of a cell. Decimal strings count as numbers.
pub fn numeric_value(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
