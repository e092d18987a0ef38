//! Result types for warehouse calls.

use std::fmt;
use std::time::Duration;

/// Rows returned by a read query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data.
    pub rows: Vec<Row>,

    /// Wall-clock time from submission to the final response.
    pub execution_time: Duration,

    /// Rows actually fetched.
    pub row_count: usize,

    /// Rows the query produced, when BigQuery reports it.
    pub total_rows: Option<u64>,

    /// Fewer rows were fetched than the query produced.
    pub was_truncated: bool,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete, untruncated result.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
            total_rows: Some(row_count as u64),
            was_truncated: false,
        }
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What the warehouse reports after running a data-modifying statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmlOutcome {
    /// Affected-row count, when the engine reports one.
    pub rows_affected: Option<u64>,

    /// Warehouse job identifier, for operator debugging.
    pub job_id: Option<String>,
}

impl DmlOutcome {
    pub fn affected(rows: u64) -> Self {
        Self {
            rows_affected: Some(rows),
            job_id: None,
        }
    }
}

/// A result column and its BigQuery type name (`INTEGER`, `STRING`, ...).
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// True for BigQuery numeric types, legacy and standard names alike.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.data_type.to_uppercase().as_str(),
            "INTEGER" | "INT64" | "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC"
        )
    }
}

pub type Row = Vec<Value>;

/// A decoded cell. BigQuery types without a variant here (dates, timestamps,
/// NUMERIC, nested records) stay as their text.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Text shown in a rendered table cell.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
