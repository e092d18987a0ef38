//! Configuration management for txn-insights.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the agent identity, the BigQuery warehouse, the write-guard policy and
//! read-path rendering limits.

use crate::error::{InsightsError, Result};
use crate::sql::{PermittedKinds, StatementKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use url::Url;

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2/";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent identity handed to the external agent runtime.
    #[serde(default)]
    pub agent: AgentConfig,

    /// BigQuery connection settings.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Which statement kinds the confirmed-write tool may execute.
    #[serde(default)]
    pub write_guard: WriteGuardConfig,

    /// Read-path settings.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Model identifier the hosting runtime should use.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// Optional file holding the agent's instruction prompt.
    pub instruction_file: Option<PathBuf>,
}

fn default_agent_name() -> String {
    "txn_insights_agent".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash-001".to_string()
}

fn default_description() -> String {
    "An expert financial data analyst that provides insights from transaction data.".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            model: default_model(),
            description: default_description(),
            instruction_file: None,
        }
    }
}

/// BigQuery warehouse configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Google Cloud project that owns the dataset and runs the jobs.
    pub project_id: Option<String>,

    /// Dataset holding the `transactions` and `categorization_rules` tables.
    #[serde(default = "default_dataset")]
    pub dataset_id: String,

    /// Job location (e.g. `US`, `europe-west1`).
    pub location: Option<String>,

    /// REST endpoint override (emulators, private endpoints).
    pub endpoint: Option<String>,

    /// OAuth2 access token (not recommended to store in config).
    pub access_token: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of times to poll for an unfinished job.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Maximum rows fetched for a read query.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_dataset() -> String {
    "equifax_txns".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_max_results() -> u32 {
    1000
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset_id: default_dataset(),
            location: None,
            endpoint: None,
            access_token: None,
            timeout_secs: default_timeout_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            max_results: default_max_results(),
        }
    }
}

impl WarehouseConfig {
    /// Applies environment variables as defaults for unset fields.
    pub fn apply_env_defaults(&mut self) {
        if self.project_id.is_none() {
            self.project_id = std::env::var("GOOGLE_CLOUD_PROJECT").ok();
        }
        if self.location.is_none() {
            self.location = std::env::var("GOOGLE_CLOUD_LOCATION").ok();
        }
        if self.endpoint.is_none() {
            self.endpoint = std::env::var("BIGQUERY_ENDPOINT").ok();
        }
        if self.access_token.is_none() {
            self.access_token = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok();
        }
    }

    /// Returns the project id, or an error naming how to set it.
    pub fn require_project(&self) -> Result<&str> {
        self.project_id.as_deref().ok_or_else(|| {
            InsightsError::config(
                "No project configured. Set [warehouse] project_id, pass --project, \
                 or set GOOGLE_CLOUD_PROJECT.",
            )
        })
    }

    /// Returns the REST endpoint as a base URL ending in `/`.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BIGQUERY_ENDPOINT);
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let url = Url::parse(&normalized)
            .map_err(|e| InsightsError::config(format!("Invalid endpoint '{raw}': {e}")))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(InsightsError::config(format!(
                "Invalid endpoint scheme '{}'. Expected 'https' or 'http'",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Fully-qualified name of the transactions table.
    pub fn transactions_table(&self) -> Result<String> {
        Ok(format!("{}.{}.transactions", self.require_project()?, self.dataset_id))
    }

    /// Fully-qualified name of the categorization rules table.
    pub fn rules_table(&self) -> Result<String> {
        Ok(format!(
            "{}.{}.categorization_rules",
            self.require_project()?,
            self.dataset_id
        ))
    }

    /// Returns a display-safe string (no token) for logs.
    pub fn display_string(&self) -> String {
        let project = self.project_id.as_deref().unwrap_or("<unset>");
        let location = self.location.as_deref().unwrap_or("default location");
        format!("{project}.{} ({location})", self.dataset_id)
    }
}

/// Write-guard policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteGuardConfig {
    /// Statement kinds the confirmed-write tool may execute.
    #[serde(default = "default_permitted")]
    pub permitted: Vec<StatementKind>,
}

fn default_permitted() -> Vec<StatementKind> {
    vec![StatementKind::Update, StatementKind::Delete]
}

impl Default for WriteGuardConfig {
    fn default() -> Self {
        Self {
            permitted: default_permitted(),
        }
    }
}

impl WriteGuardConfig {
    /// Validates the configured kinds and returns them as a permitted set.
    ///
    /// Only mutating kinds are accepted; reads belong to the query tool.
    pub fn permitted_kinds(&self) -> Result<PermittedKinds> {
        if self.permitted.is_empty() {
            return Err(InsightsError::config(
                "[write_guard] permitted must name at least one of insert, update, delete",
            ));
        }
        if let Some(kind) = self.permitted.iter().find(|k| !k.is_mutating()) {
            return Err(InsightsError::config(format!(
                "[write_guard] permitted may only contain insert, update, delete; found '{}'",
                kind.as_str()
            )));
        }
        Ok(PermittedKinds::new(self.permitted.iter().copied()))
    }
}

/// Read-path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum rows rendered into a tool result.
    #[serde(default = "default_max_rendered_rows")]
    pub max_rendered_rows: usize,
}

fn default_max_rendered_rows() -> usize {
    50
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rendered_rows: default_max_rendered_rows(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("txn-insights")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightsError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            InsightsError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Reads the agent instruction file, if one is configured.
    pub fn load_instruction(&self) -> Result<Option<String>> {
        let Some(path) = &self.agent.instruction_file else {
            return Ok(None);
        };
        std::fs::read_to_string(path).map(Some).map_err(|e| {
            InsightsError::config(format!(
                "Failed to read instruction file {}: {e}",
                path.display()
            ))
        })
    }
}
