//! Structural read-only verification for the query tool.
//!
//! Uses sqlparser-rs with the BigQuery dialect. A leading `SELECT` keyword is
//! not enough on its own: BigQuery accepts multi-statement scripts, so
//! `SELECT 1; DELETE FROM t WHERE TRUE` must be refused here.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;

use crate::error::{InsightsError, Result};

/// Verifies that `sql` is exactly one query with no embedded data modification.
///
/// SQL that cannot be parsed is refused rather than passed through.
pub fn verify_read_only(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&BigQueryDialect {}, sql).map_err(|e| {
        InsightsError::policy(format!("Could not parse SQL for read-only verification: {e}"))
    })?;

    match statements.as_slice() {
        [] => Err(InsightsError::policy("Empty SQL statement")),
        [Statement::Query(query)] => check_query(query),
        [_] => Err(InsightsError::policy(
            "Only SELECT queries can be run through the read-only tool",
        )),
        many => Err(InsightsError::policy(format!(
            "Expected exactly one statement, found {}",
            many.len()
        ))),
    }
}

fn check_query(query: &Query) -> Result<()> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(&cte.query)?;
        }
    }
    check_set_expr(&query.body)
}

fn check_set_expr(set_expr: &SetExpr) -> Result<()> {
    match set_expr {
        SetExpr::Select(select) => check_select(select),
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        // Insert/Update and any newer data-modifying bodies
        _ => Err(InsightsError::policy(
            "Query contains a data-modifying statement",
        )),
    }
}

fn check_select(select: &Select) -> Result<()> {
    for table_with_joins in &select.from {
        check_table_with_joins(table_with_joins)?;
    }
    Ok(())
}

fn check_table_with_joins(twj: &TableWithJoins) -> Result<()> {
    check_table_factor(&twj.relation)?;
    for join in &twj.joins {
        check_table_factor(&join.relation)?;
    }
    Ok(())
}

fn check_table_factor(factor: &TableFactor) -> Result<()> {
    match factor {
        TableFactor::Derived { subquery, .. } => check_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}
