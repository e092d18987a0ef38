//! txn-insights - tool layer for a BigQuery transaction-insights agent.

mod cli;

use cli::{Cli, Command};
use serde::Serialize;
use tracing::{error, info};
use txn_insights::agent::AgentManifest;
use txn_insights::config::Config;
use txn_insights::error::{InsightsError, Result};
use txn_insights::guard::WriteGuard;
use txn_insights::logging;
use txn_insights::query::QueryExecutor;
use txn_insights::sql::{classify_statement, PermittedKinds};
use txn_insights::tools::{self, Toolset};
use txn_insights::warehouse;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    let log_to_file = cli.log_file;
    if log_to_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        if log_to_file {
            eprintln!("{}: {}", e.category(), e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.validate().map_err(InsightsError::config)?;

    // Precedence: CLI flags, then the config file, then the environment.
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);
    config.warehouse.apply_env_defaults();

    let permitted = config.write_guard.permitted_kinds()?;

    match cli.command {
        Command::Classify { sql } => {
            let sql = read_sql(&sql)?;
            print_classification(&sql, &permitted);
        }
        Command::Tools => print_json(&tools::definitions(&permitted))?,
        Command::Manifest => {
            let manifest = AgentManifest::build(&config, tools::definitions(&permitted))?;
            print_json(&manifest)?;
        }
        Command::Query { sql } => {
            let sql = read_sql(&sql)?;
            let toolset = build_toolset(&config, cli.mock, permitted)?;
            println!("{}", toolset.invoke(tools::QUERY_TOOL, &sql_arguments(sql)).await);
        }
        Command::Write { sql, yes } => {
            let sql = read_sql(&sql)?;
            if !yes && !confirm(&sql)? {
                println!("Aborted: confirmation not received. Nothing was executed.");
                return Ok(());
            }
            let toolset = build_toolset(&config, cli.mock, permitted)?;
            println!(
                "{}",
                toolset
                    .invoke(tools::CONFIRMED_UPDATE_TOOL, &sql_arguments(sql))
                    .await
            );
        }
        Command::Invoke { tool, args } => {
            let arguments = match args {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                    InsightsError::config(format!("--args is not valid JSON: {e}"))
                })?,
                None => serde_json::Value::Null,
            };
            let toolset = build_toolset(&config, cli.mock, permitted)?;
            println!("{}", toolset.invoke(&tool, &arguments).await);
        }
        Command::Serve => {
            let toolset = build_toolset(&config, cli.mock, permitted)?;
            info!("Serving tool calls on stdin/stdout");
            let answered = tools::serve(
                &toolset,
                tokio::io::BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await
            .map_err(|e| InsightsError::internal(format!("Tool server I/O failed: {e}")))?;
            info!(answered, "Input closed, tool server stopped");
        }
    }

    Ok(())
}

/// Connects the warehouse and binds both tools to it.
fn build_toolset(config: &Config, mock: bool, permitted: PermittedKinds) -> Result<Toolset> {
    if mock {
        info!("Warehouse: in-memory mock");
    } else {
        info!("Warehouse: {}", config.warehouse.display_string());
    }
    let warehouse = warehouse::connect(&config.warehouse, mock)?;
    let query = QueryExecutor::new(warehouse.clone(), config.query.max_rendered_rows);
    let guard = WriteGuard::new(warehouse, permitted);
    Ok(Toolset::new(query, guard))
}

fn sql_arguments(sql: String) -> serde_json::Value {
    serde_json::json!({ "sql_query": sql })
}

fn read_sql(arg: &str) -> Result<String> {
    cli::read_sql(arg)
        .map_err(|e| InsightsError::internal(format!("Failed to read SQL from stdin: {e}")))
}

fn confirm(sql: &str) -> Result<bool> {
    let kind = classify_statement(sql);
    cli::confirm_execution(sql, kind, &mut std::io::stdin().lock(), &mut std::io::stderr())
        .map_err(|e| InsightsError::internal(format!("Failed to read confirmation: {e}")))
}

fn print_classification(sql: &str, permitted: &PermittedKinds) {
    let kind = classify_statement(sql);
    println!("kind: {}", kind.as_str());
    if permitted.contains(kind) {
        println!("write tool: permitted");
    } else {
        println!("write tool: rejected (policy allows {permitted})");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| InsightsError::internal(format!("Failed to encode JSON: {e}")))?;
    println!("{json}");
    Ok(())
}
