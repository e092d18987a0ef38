//! Guarded write path.
//!
//! Executes a single confirmed data-modifying statement, but only if its
//! leading keyword is one of the permitted statement kinds. The upstream
//! confirmation step (a human typing `CONFIRM`) is the caller's business;
//! the guard trusts whoever invokes it.
//!
//! Each call submits at most one statement. There is no transaction
//! wrapping, so a caller that needs several statements to land together
//! must handle partial completion itself.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::outcome::{shielded, ExternalFailure};
use crate::sql::{classify_statement, PermittedKinds, StatementKind};
use crate::warehouse::Warehouse;

/// Outcome of one guarded execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The statement ran. `rows_affected` is `None` when the engine did not report a count.
    Success { rows_affected: Option<u64> },
    /// The statement kind is not permitted; the warehouse was not contacted.
    RejectedByPolicy {
        kind: StatementKind,
        permitted: PermittedKinds,
    },
    /// The warehouse call failed.
    ExternalFailure(ExternalFailure),
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                rows_affected: Some(n),
            } => write!(f, "Operation successful, {n} row(s) affected."),
            Self::Success {
                rows_affected: None,
            } => write!(
                f,
                "Operation successful, but the number of affected rows is not available."
            ),
            Self::RejectedByPolicy { kind, permitted } => {
                write!(
                    f,
                    "Error: This tool can only execute {permitted} statements, but the statement \
                     was classified as {kind}."
                )?;
                if *kind == StatementKind::Read {
                    write!(f, " Use the read-only query tool for SELECT queries.")?;
                }
                Ok(())
            }
            Self::ExternalFailure(failure) => write!(f, "{failure}"),
        }
    }
}

/// Executes confirmed data-modifying statements within a permitted-kind policy.
#[derive(Clone)]
pub struct WriteGuard {
    warehouse: Arc<dyn Warehouse>,
    permitted: PermittedKinds,
}

impl WriteGuard {
    /// Creates a guard over an already-initialized warehouse client.
    pub fn new(warehouse: Arc<dyn Warehouse>, permitted: PermittedKinds) -> Self {
        Self {
            warehouse,
            permitted,
        }
    }

    pub fn permitted(&self) -> &PermittedKinds {
        &self.permitted
    }

    /// Classifies `sql` and, if its kind is permitted, submits it verbatim.
    pub async fn execute(&self, sql: &str) -> ExecutionOutcome {
        let kind = classify_statement(sql);

        if !self.permitted.contains(kind) {
            info!(kind = kind.as_str(), permitted = %self.permitted, "Rejected statement by policy");
            return ExecutionOutcome::RejectedByPolicy {
                kind,
                permitted: self.permitted.clone(),
            };
        }

        match shielded(self.warehouse.execute_dml(sql)).await {
            Ok(outcome) => {
                info!(
                    kind = kind.as_str(),
                    rows_affected = ?outcome.rows_affected,
                    job_id = ?outcome.job_id,
                    "Confirmed statement executed"
                );
                ExecutionOutcome::Success {
                    rows_affected: outcome.rows_affected,
                }
            }
            Err(failure) => {
                warn!(kind = kind.as_str(), api = failure.is_api(), "Confirmed statement failed: {}", failure.message);
                ExecutionOutcome::ExternalFailure(failure)
            }
        }
    }
}
