//! Execution result types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::statement::OperationKind;
use crate::value::Value;

/// A row from a query result
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
    /// Column names
    columns: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Convert to an insertion-ordered map
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

/// Status of a single statement within a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementStatus {
    /// Statement executed successfully
    Success,
    /// Statement failed with an error
    Failed,
    /// Statement was skipped after an earlier failure
    Skipped,
}

/// Outcome of one statement in a script execution
#[derive(Debug, Clone)]
pub struct StatementOutcome {
    /// Zero-based position in the script
    pub index: usize,
    /// The statement text
    pub sql: String,
    pub status: StatementStatus,
    /// Rows affected, when the driver reports it
    pub rows_affected: Option<u64>,
    /// Error message for failed statements
    pub error: Option<String>,
}

impl StatementOutcome {
    pub fn success(index: usize, sql: impl Into<String>, rows_affected: Option<u64>) -> Self {
        Self {
            index,
            sql: sql.into(),
            status: StatementStatus::Success,
            rows_affected,
            error: None,
        }
    }

    pub fn failed(index: usize, sql: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            index,
            sql: sql.into(),
            status: StatementStatus::Failed,
            rows_affected: None,
            error: Some(error.into()),
        }
    }

    pub fn skipped(index: usize, sql: impl Into<String>) -> Self {
        Self {
            index,
            sql: sql.into(),
            status: StatementStatus::Skipped,
            rows_affected: None,
            error: None,
        }
    }
}

/// Normalized result of a dispatch call
#[derive(Debug, Clone, Default)]
pub struct SqlResult {
    /// How the statement was executed
    pub operation: Option<OperationKind>,
    /// Result rows, for row-returning statements
    pub rows: Option<Vec<Row>>,
    /// Column names, for row-returning statements
    pub column_names: Option<Vec<String>>,
    /// Rows affected, for DML statements
    pub rows_affected: Option<u64>,
    /// Number of statements executed, for scripts
    pub statement_count: Option<usize>,
    /// Per-statement outcomes, for scripts
    pub statement_outcomes: Option<Vec<StatementOutcome>>,
    /// Free-form result metadata
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl SqlResult {
    /// A row-returning result
    pub fn selected(operation: OperationKind, rows: Vec<Row>, column_names: Vec<String>) -> Self {
        Self {
            operation: Some(operation),
            rows: Some(rows),
            column_names: Some(column_names),
            ..Self::default()
        }
    }

    /// A rows-affected result
    pub fn affected(operation: OperationKind, rows_affected: u64) -> Self {
        Self {
            operation: Some(operation),
            rows_affected: Some(rows_affected),
            ..Self::default()
        }
    }

    /// A script result with per-statement outcomes
    pub fn script(outcomes: Vec<StatementOutcome>) -> Self {
        let rows_affected = outcomes.iter().filter_map(|o| o.rows_affected).sum();
        Self {
            operation: Some(OperationKind::Script),
            rows_affected: Some(rows_affected),
            statement_count: Some(outcomes.len()),
            statement_outcomes: Some(outcomes),
            ..Self::default()
        }
    }

    pub fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}
