//! Command-line argument parsing for txn-insights.
//!
//! Uses clap derive: global connection flags plus one subcommand per tool
//! surface. The `write` subcommand gates execution behind a typed `CONFIRM`.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use txn_insights::config::Config;
use txn_insights::sql::StatementKind;

/// The exact reply that authorizes a write.
pub const CONFIRM_TOKEN: &str = "CONFIRM";

/// Tool layer for a BigQuery transaction-insights agent.
#[derive(Parser, Debug)]
#[command(name = "txn-insights")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, env = "TXN_INSIGHTS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Google Cloud project (overrides the config file)
    #[arg(long, global = true, value_name = "ID")]
    pub project: Option<String>,

    /// BigQuery location, e.g. US or europe-west2 (overrides the config file)
    #[arg(long, global = true, value_name = "LOCATION")]
    pub location: Option<String>,

    /// Use the in-memory mock warehouse instead of BigQuery
    #[arg(long, global = true)]
    pub mock: bool,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a read-only query and print the rows as a Markdown table
    Query {
        /// SQL statement, or "-" to read it from stdin
        sql: String,
    },

    /// Run a data-modifying statement after typing CONFIRM
    Write {
        /// SQL statement, or "-" to read it from stdin (requires --yes)
        sql: String,

        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show a statement's kind and whether the write policy permits it
    Classify {
        /// SQL statement, or "-" to read it from stdin
        sql: String,
    },

    /// Print the tool definitions as JSON
    Tools,

    /// Invoke one tool and print its result
    Invoke {
        /// Tool name
        tool: String,

        /// Tool arguments as JSON, e.g. '{"sql_query": "SELECT 1"}'
        #[arg(long, value_name = "JSON")]
        args: Option<String>,
    },

    /// Serve tool calls as JSON lines over stdin/stdout
    Serve,

    /// Print the agent manifest as JSON
    Manifest,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Rejects argument combinations clap cannot express.
    ///
    /// Stdin can carry the statement or the confirmation, not both.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Command::Write { sql, yes: false } = &self.command {
            if sql == "-" {
                return Err(
                    "write - reads the statement from stdin, so it cannot also read CONFIRM; \
                     pass --yes to run it"
                        .to_string(),
                );
            }
        }
        Ok(())
    }

    /// Applies command-line overrides on top of the loaded config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(project) = &self.project {
            config.warehouse.project_id = Some(project.clone());
        }
        if let Some(location) = &self.location {
            config.warehouse.location = Some(location.clone());
        }
    }
}

/// Resolves a SQL argument, reading stdin when it is `-`.
pub fn read_sql(arg: &str) -> io::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut sql = String::new();
    io::stdin().read_to_string(&mut sql)?;
    Ok(sql)
}

/// Shows the statement and asks the operator to type [`CONFIRM_TOKEN`].
///
/// Returns true only for that exact reply, surrounding whitespace aside.
/// End of input counts as a refusal.
pub fn confirm_execution<R: BufRead, W: Write>(
    sql: &str,
    kind: StatementKind,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<bool> {
    writeln!(writer, "Statement ({kind}):")?;
    writeln!(writer)?;
    writeln!(writer, "    {}", sql.trim())?;
    writeln!(writer)?;
    write!(writer, "Type {CONFIRM_TOKEN} to execute: ")?;
    writer.flush()?;

    let mut reply = String::new();
    reader.read_line(&mut reply)?;
    Ok(reply.trim() == CONFIRM_TOKEN)
}
