//! Live BigQuery tests.
//!
//! Skipped unless BIGQUERY_TEST_PROJECT and GOOGLE_OAUTH_ACCESS_TOKEN are set.
//! The DML test also needs BIGQUERY_TEST_DATASET: it creates a uniquely named
//! scratch table there and drops it afterwards.

use txn_insights::config::WarehouseConfig;
use txn_insights::warehouse::{BigQueryClient, Value, Warehouse};

/// Helper to create a client for the test project.
fn get_test_client() -> Option<BigQueryClient> {
    let project = std::env::var("BIGQUERY_TEST_PROJECT").ok()?;
    let mut config = WarehouseConfig {
        project_id: Some(project),
        ..Default::default()
    };
    config.apply_env_defaults();
    config.access_token.as_ref()?;
    BigQueryClient::new(&config).ok()
}

#[tokio::test]
async fn test_run_simple_select() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: BIGQUERY_TEST_PROJECT not set");
        return;
    };

    let result = client
        .run_query("SELECT 1 AS num, 'hello' AS greeting, TRUE AS flag")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 3);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::String("hello".to_string()));
    assert_eq!(result.rows[0][2], Value::Bool(true));
}

#[tokio::test]
async fn test_invalid_sql_is_api_error() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: BIGQUERY_TEST_PROJECT not set");
        return;
    };

    let err = client.run_query("SELECT FROM WHERE").await.unwrap_err();

    assert!(err.is_api(), "expected API error, got: {err}");
    assert!(err.to_string().contains("INVALID_ARGUMENT") || err.to_string().contains("400"));
}

/// Fully-qualified name for a scratch table nobody else is using.
fn scratch_table(project: &str, dataset: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("`{project}.{dataset}.scratch_{}_{nanos}`", std::process::id())
}

#[tokio::test]
async fn test_dml_reports_affected_rows() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: BIGQUERY_TEST_PROJECT not set");
        return;
    };
    let Ok(dataset) = std::env::var("BIGQUERY_TEST_DATASET") else {
        eprintln!("Skipping test: BIGQUERY_TEST_DATASET not set");
        return;
    };
    let project = std::env::var("BIGQUERY_TEST_PROJECT").unwrap();
    let table = scratch_table(&project, &dataset);

    client
        .execute_dml(&format!(
            "CREATE TABLE {table} AS SELECT 1 AS id UNION ALL SELECT 2"
        ))
        .await
        .unwrap();

    let deleted = client
        .execute_dml(&format!("DELETE FROM {table} WHERE id = 1"))
        .await;
    let missed = client
        .execute_dml(&format!("UPDATE {table} SET id = 3 WHERE id = 99"))
        .await;
    client
        .execute_dml(&format!("DROP TABLE {table}"))
        .await
        .unwrap();

    let deleted = deleted.unwrap();
    assert_eq!(deleted.rows_affected, Some(1));
    assert!(deleted.job_id.is_some());
    assert_eq!(missed.unwrap().rows_affected, Some(0));
}

#[tokio::test]
async fn test_statement_without_count_reports_none() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: BIGQUERY_TEST_PROJECT not set");
        return;
    };

    let outcome = client.execute_dml("SELECT 1").await.unwrap();

    assert_eq!(outcome.rows_affected, None);
    assert!(outcome.job_id.is_some());
}
