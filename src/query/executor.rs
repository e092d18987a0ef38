//! Read-only query execution.
//!
//! The read tool's counterpart to the write guard: only statements that
//! classify as reads and pass structural verification reach the warehouse.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::render::markdown_table;
use crate::error::InsightsError;
use crate::outcome::{shielded, ExternalFailure};
use crate::sql::{classify_statement, verify_read_only, StatementKind};
use crate::warehouse::{QueryResult, Warehouse};

/// Result of running a read query.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The query ran; rendered with at most `max_rows` rows.
    Rows {
        result: QueryResult,
        max_rows: usize,
    },
    /// The statement was refused before reaching the warehouse.
    RejectedByPolicy { reason: String },
    /// The warehouse call failed.
    ExternalFailure(ExternalFailure),
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows { result, max_rows } => write!(f, "{}", markdown_table(result, *max_rows)),
            Self::RejectedByPolicy { reason } => write!(f, "Error: {reason}"),
            Self::ExternalFailure(failure) => write!(f, "{failure}"),
        }
    }
}

/// Executes read-only queries.
#[derive(Clone)]
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
    max_rendered_rows: usize,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(warehouse: Arc<dyn Warehouse>, max_rendered_rows: usize) -> Self {
        Self {
            warehouse,
            max_rendered_rows,
        }
    }

    /// Verifies `sql` is a read query and runs it.
    pub async fn execute(&self, sql: &str) -> ReadOutcome {
        let kind = classify_statement(sql);
        if kind != StatementKind::Read {
            info!(kind = kind.as_str(), "Rejected non-read statement on the query tool");
            let reason = if kind.is_mutating() {
                format!(
                    "This tool only runs read-only SELECT queries, but the statement was \
                     classified as {kind}. Data changes must be shown to the user and \
                     confirmed before using the confirmed-update tool."
                )
            } else {
                "This tool only runs read-only SELECT queries; the statement does not \
                 start with SELECT or WITH."
                    .to_string()
            };
            return ReadOutcome::RejectedByPolicy { reason };
        }

        if let Err(e) = verify_read_only(sql) {
            info!("Rejected query failing read-only verification: {e}");
            let reason = match e {
                InsightsError::Policy(reason) => reason,
                other => other.to_string(),
            };
            return ReadOutcome::RejectedByPolicy { reason };
        }

        debug!(sql_len = sql.len(), "Running read query");
        match shielded(self.warehouse.run_query(sql)).await {
            Ok(result) => {
                info!(
                    row_count = result.row_count,
                    execution_ms = result.execution_time.as_millis() as u64,
                    "Read query complete"
                );
                ReadOutcome::Rows {
                    result,
                    max_rows: self.max_rendered_rows,
                }
            }
            Err(failure) => {
                warn!(api = failure.is_api(), "Read query failed: {}", failure.message);
                ReadOutcome::ExternalFailure(failure)
            }
        }
    }
}
