//! Tool definitions and dispatch for agent function calling.
//!
//! Exposes the read path and the guarded write path as two named tools, each
//! taking a single `sql_query` string and returning a single string. Tool
//! calls can also be served over stdio as line-delimited JSON.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::guard::WriteGuard;
use crate::query::QueryExecutor;
use crate::sql::PermittedKinds;

/// Name of the read-only query tool.
pub const QUERY_TOOL: &str = "execute_sql";

/// Name of the confirmed-write tool.
pub const CONFIRMED_UPDATE_TOOL: &str = "execute_confirmed_update";

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Input parameters shared by both tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlToolInput {
    pub sql_query: String,
}

/// A tool call requested by the agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// ID used to match the result to the call.
    #[serde(default)]
    pub id: String,
    /// Name of the tool to call.
    pub name: String,
    /// Arguments, as a JSON object or a JSON-encoded string.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result is for.
    pub tool_call_id: String,
    /// Human-readable outcome.
    pub content: String,
}

fn sql_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "sql_query": {
                "type": "string",
                "description": "A single BigQuery Standard SQL statement"
            }
        },
        "required": ["sql_query"]
    })
}

/// Returns the tool definitions available to the agent.
///
/// The write tool's description names the permitted statement kinds so the
/// model knows which statements it may route there.
pub fn definitions(permitted: &PermittedKinds) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: QUERY_TOOL.to_string(),
            description: "Run a single read-only SELECT query against the transactions \
                          dataset and return the rows as a Markdown table. Data-modifying \
                          statements are refused."
                .to_string(),
            parameters: sql_parameters(),
        },
        ToolDefinition {
            name: CONFIRMED_UPDATE_TOOL.to_string(),
            description: format!(
                "Execute a single {permitted} statement. Only call this after showing the \
                 exact SQL to the user and receiving the reply 'CONFIRM'. Returns the number \
                 of affected rows, or the error reported by BigQuery."
            ),
            parameters: sql_parameters(),
        },
    ]
}

/// The read and write tools bound to their executors.
#[derive(Clone)]
pub struct Toolset {
    query: QueryExecutor,
    guard: WriteGuard,
}

impl Toolset {
    pub fn new(query: QueryExecutor, guard: WriteGuard) -> Self {
        Self { query, guard }
    }

    /// Returns the tool definitions for this toolset's write policy.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        definitions(self.guard.permitted())
    }

    /// Invokes a tool by name. Every failure is reported in the returned text.
    pub async fn invoke(&self, name: &str, arguments: &serde_json::Value) -> String {
        if name != QUERY_TOOL && name != CONFIRMED_UPDATE_TOOL {
            warn!(tool = name, "Unknown tool requested");
            return format!(
                "Error: Unknown tool '{name}'. Available tools: {QUERY_TOOL}, {CONFIRMED_UPDATE_TOOL}."
            );
        }

        let input = match parse_input(arguments) {
            Ok(input) => input,
            Err(e) => {
                return format!("Error: Invalid arguments for {name}: {e}. Expected {{\"sql_query\": \"...\"}}.")
            }
        };

        debug!(tool = name, sql_len = input.sql_query.len(), "Invoking tool");
        if name == QUERY_TOOL {
            self.query.execute(&input.sql_query).await.to_string()
        } else {
            self.guard.execute(&input.sql_query).await.to_string()
        }
    }

    /// Handles one tool call, producing the matching result.
    pub async fn handle(&self, call: ToolCall) -> ToolResult {
        let content = self.invoke(&call.name, &call.arguments).await;
        ToolResult {
            tool_call_id: call.id,
            content,
        }
    }
}

fn parse_input(arguments: &serde_json::Value) -> serde_json::Result<SqlToolInput> {
    match arguments {
        serde_json::Value::String(encoded) => serde_json::from_str(encoded),
        other => serde_json::from_value(other.clone()),
    }
}

/// Serves tool calls: one JSON [`ToolCall`] per input line, one JSON [`ToolResult`] per output line.
///
/// Malformed lines are answered with an error result and serving continues.
/// Returns the number of calls answered when the input ends.
pub async fn serve<R, W>(toolset: &Toolset, reader: R, mut writer: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => toolset.handle(call).await,
            Err(e) => {
                warn!("Malformed tool call: {e}");
                ToolResult {
                    tool_call_id: String::new(),
                    content: format!("Error: Malformed tool call: {e}"),
                }
            }
        };

        let mut encoded = serde_json::to_string(&result)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        answered += 1;
    }

    Ok(answered)
}
