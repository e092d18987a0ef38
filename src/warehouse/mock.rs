//! Mock warehouse client for testing.
//!
//! Records every statement it receives and answers with configured responses,
//! so tests can assert both what was sent and how failures are reported.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ColumnInfo, DmlOutcome, QueryResult, Value, Warehouse};
use crate::error::{InsightsError, Result};

/// A canned answer for the mock to give.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these rows.
    Rows(QueryResult),
    /// Finish a DML statement, reporting this affected-row count (or none).
    Affected(Option<u64>),
    /// Fail the way the warehouse API does.
    ApiError(String),
    /// Fail at the transport layer.
    ConnectionError(String),
    /// Panic inside the client.
    Panic(String),
}

/// A mock warehouse that returns predefined results.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    query_response: Option<MockResponse>,
    dml_response: Option<MockResponse>,
    calls: Mutex<Vec<String>>,
}

impl MockWarehouse {
    /// Creates a mock that echoes queries back as a single row and reports zero affected rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response for `run_query`.
    pub fn with_query_response(mut self, response: MockResponse) -> Self {
        self.query_response = Some(response);
        self
    }

    /// Sets the response for `execute_dml`.
    pub fn with_dml_response(mut self, response: MockResponse) -> Self {
        self.dml_response = Some(response);
        self
    }

    /// Returns every statement received so far, in order, exactly as sent.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the number of statements received so far.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn record(&self, sql: &str) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sql.to_string());
    }
}

fn fail(response: &MockResponse) -> Option<InsightsError> {
    match response {
        MockResponse::ApiError(msg) => Some(InsightsError::api(msg.clone())),
        MockResponse::ConnectionError(msg) => Some(InsightsError::connection(msg.clone())),
        MockResponse::Panic(msg) => panic!("{msg}"),
        MockResponse::Rows(_) | MockResponse::Affected(_) => None,
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        self.record(sql);

        let Some(response) = &self.query_response else {
            let columns = vec![ColumnInfo::new("result", "STRING")];
            let rows = vec![vec![Value::String(format!("Mock result for: {sql}"))]];
            return Ok(QueryResult::with_data(columns, rows)
                .with_execution_time(Duration::from_millis(1)));
        };

        if let Some(err) = fail(response) {
            return Err(err);
        }
        match response {
            MockResponse::Rows(result) => Ok(result.clone()),
            _ => Ok(QueryResult::new()),
        }
    }

    async fn execute_dml(&self, sql: &str) -> Result<DmlOutcome> {
        self.record(sql);

        let Some(response) = &self.dml_response else {
            return Ok(DmlOutcome::affected(0));
        };

        if let Some(err) = fail(response) {
            return Err(err);
        }
        match response {
            MockResponse::Affected(rows_affected) => Ok(DmlOutcome {
                rows_affected: *rows_affected,
                job_id: Some("mock-job".to_string()),
            }),
            _ => Err(InsightsError::internal(
                "mock DML response must be Affected or a failure",
            )),
        }
    }
}
