//! txn-insights - tool layer for a BigQuery transaction-insights agent.
//!
//! Exposes a read-only SQL tool and a policy-guarded, confirmed-write SQL
//! tool over a BigQuery dataset, for use by an external agent runtime.

pub mod agent;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod outcome;
pub mod query;
pub mod sql;
pub mod tools;
pub mod warehouse;
