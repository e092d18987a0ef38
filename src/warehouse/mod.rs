//! Warehouse abstraction layer.
//!
//! Provides a trait-based interface for the analytical database, so the read
//! and write tools can be handed a live BigQuery client or a test double.

mod bigquery;
mod mock;
mod types;

pub use bigquery::BigQueryClient;
pub use mock::{MockResponse, MockWarehouse};
pub use types::{ColumnInfo, DmlOutcome, QueryResult, Row, Value};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::WarehouseConfig;
use crate::error::Result;

/// Trait defining the interface for warehouse clients.
///
/// Both calls submit a single statement and resolve once the warehouse has
/// finished with it; there are no partial results.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs a read query and returns its rows.
    async fn run_query(&self, sql: &str) -> Result<QueryResult>;

    /// Runs a data-modifying statement and returns what the engine reports.
    async fn execute_dml(&self, sql: &str) -> Result<DmlOutcome>;
}

/// Creates the warehouse client for the given configuration.
///
/// With `mock` set, returns an in-memory client that never leaves the process.
pub fn connect(config: &WarehouseConfig, mock: bool) -> Result<Arc<dyn Warehouse>> {
    if mock {
        return Ok(Arc::new(MockWarehouse::new()));
    }
    Ok(Arc::new(BigQueryClient::new(config)?))
}
