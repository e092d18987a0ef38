//! Tool layer tests: both tools through the toolset and the stdio server.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use txn_insights::guard::WriteGuard;
use txn_insights::query::QueryExecutor;
use txn_insights::sql::PermittedKinds;
use txn_insights::tools::{serve, ToolResult, Toolset, CONFIRMED_UPDATE_TOOL, QUERY_TOOL};
use txn_insights::warehouse::{ColumnInfo, MockResponse, MockWarehouse, QueryResult, Value};

fn toolset(mock: &Arc<MockWarehouse>) -> Toolset {
    Toolset::new(
        QueryExecutor::new(mock.clone(), 2),
        WriteGuard::new(mock.clone(), PermittedKinds::update_delete()),
    )
}

#[tokio::test]
async fn test_query_tool_renders_and_caps_rows() {
    let result = QueryResult::with_data(
        vec![
            ColumnInfo::new("category", "STRING"),
            ColumnInfo::new("total", "FLOAT"),
        ],
        vec![
            vec![Value::from("Groceries"), Value::Float(412.5)],
            vec![Value::from("Dining"), Value::Float(120.0)],
            vec![Value::from("Travel"), Value::Float(88.25)],
        ],
    );
    let mock = Arc::new(MockWarehouse::new().with_query_response(MockResponse::Rows(result)));

    let text = toolset(&mock)
        .invoke(
            QUERY_TOOL,
            &serde_json::json!({"sql_query": "SELECT category, SUM(amount) AS total FROM transactions GROUP BY 1"}),
        )
        .await;

    assert!(text.contains("| category | total |"), "got: {text}");
    assert!(text.contains("| --- | ---: |"), "numeric column should be right-aligned: {text}");
    assert!(text.contains("| Groceries |"));
    assert!(text.contains("| Dining |"));
    assert!(!text.contains("| Travel |"));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_query_tool_refuses_writes() {
    let mock = Arc::new(MockWarehouse::new());

    let text = toolset(&mock)
        .invoke(
            QUERY_TOOL,
            &serde_json::json!({"sql_query": "DELETE FROM categorization_rules WHERE TRUE"}),
        )
        .await;

    assert!(text.starts_with("Error:"), "got: {text}");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_write_tool_reports_api_error() {
    let mock = Arc::new(MockWarehouse::new().with_dml_response(MockResponse::ApiError(
        "403 ACCESS_DENIED: Access Denied: Table fsi-demo:equifax_txns.transactions".to_string(),
    )));

    let text = toolset(&mock)
        .invoke(
            CONFIRMED_UPDATE_TOOL,
            &serde_json::json!({"sql_query": "UPDATE transactions SET category = 'Travel' WHERE id = 7"}),
        )
        .await;

    assert_eq!(
        text,
        "An API error occurred: 403 ACCESS_DENIED: Access Denied: Table fsi-demo:equifax_txns.transactions"
    );
}

#[tokio::test]
async fn test_serve_round_trip() {
    let mock = Arc::new(MockWarehouse::new().with_dml_response(MockResponse::Affected(Some(4))));
    let tools = toolset(&mock);
    let input = concat!(
        r#"{"id": "call-1", "name": "execute_confirmed_update", "arguments": "{\"sql_query\": \"DELETE FROM categorization_rules WHERE identifier = 'UBER'\"}"}"#,
        "\n",
        r#"{"id": "call-2", "name": "execute_sql", "arguments": {"sql_query": "SELECT 1"}}"#,
        "\n",
    );
    let mut output = Vec::new();

    let answered = serve(&tools, tokio::io::BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    assert_eq!(answered, 2);
    let results: Vec<ToolResult> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(results[0].tool_call_id, "call-1");
    assert_eq!(results[0].content, "Operation successful, 4 row(s) affected.");
    assert_eq!(results[1].tool_call_id, "call-2");
    assert!(results[1].content.contains("Mock result for: SELECT 1"));
    assert_eq!(
        mock.calls(),
        vec![
            "DELETE FROM categorization_rules WHERE identifier = 'UBER'".to_string(),
            "SELECT 1".to_string(),
        ]
    );
}
