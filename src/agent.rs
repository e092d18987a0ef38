//! Agent manifest for the external agent runtime.
//!
//! Describes the agent (identity, model, instruction, tables and tools) as
//! JSON, so a hosting runtime can be pointed at this tool layer.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::sql::StatementKind;
use crate::tools::ToolDefinition;

/// Everything the hosting runtime needs to wire up the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub name: String,
    pub model: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    pub tables: ManifestTables,
    /// Statement kinds the confirmed-write tool accepts.
    pub write_policy: Vec<StatementKind>,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTables {
    pub transactions: String,
    pub categorization_rules: String,
}

impl AgentManifest {
    /// Builds the manifest from configuration and the live tool definitions.
    pub fn build(config: &Config, tools: Vec<ToolDefinition>) -> Result<Self> {
        let permitted = config.write_guard.permitted_kinds()?;
        Ok(Self {
            name: config.agent.name.clone(),
            model: config.agent.model.clone(),
            description: config.agent.description.clone(),
            instruction: config.load_instruction()?,
            tables: ManifestTables {
                transactions: config.warehouse.transactions_table()?,
                categorization_rules: config.warehouse.rules_table()?,
            },
            write_policy: permitted.iter().collect(),
            tools,
        })
    }
}
