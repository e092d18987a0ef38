//! Library-level integration tests.

pub mod bigquery_test;
pub mod tools_test;
