//! Process assembly and project initialization
//!
//! Builds the gateway, executor, agents, registry and routing rules from a
//! validated [`Config`], and writes the default project configuration for
//! `sqlpilot init`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::config::{ConfigLoader, CONFIG_DIR};
use crate::adapters::database::{MockExecutor, SqliteExecutor};
use crate::adapters::gateways::{AnthropicConfig, AnthropicGateway, MockGateway};
use crate::domain::errors::{ConfigurationError, ExecutionError, GatewayError};
use crate::domain::models::{Config, LlmProvider, SchemaDescription};
use crate::domain::ports::{DatabaseExecutor, LlmGateway};
use crate::services::text2sql::{PipelineSettings, Text2SqlAgent, Text2SqlPipeline};
use crate::services::{AgentRegistry, Orchestrator, TaskRouter};

/// Default configuration template content
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# sqlpilot configuration
# Override settings by editing this file, adding .sqlpilot/local.yaml,
# or setting environment variables with the SQLPILOT_ prefix
#
# Example environment variables:
#   export SQLPILOT_DATABASE__URL=sqlite:/data/shop.db
#   export SQLPILOT_AGENTS__TEXT2SQL__MAX_RETRIES=3
#   export SQLPILOT_LOGGING__LEVEL=debug

# Keyword -> category (sql, query, database) or agent name
task_routing:
  "how many": text2sql
  "list": query
  "show me": query
  "count": sql
  "average": sql
  "total": sql
  "table": database

routing:
  # substring | whole_word
  match_mode: substring

agents:
  text2sql:
    enabled: true
    priority: 100
    model: "claude-sonnet-4-5-20250929"
    temperature: 0.1
    max_retries: 2

llm:
  # anthropic | mock
  provider: anthropic
  # Leave unset to read ANTHROPIC_API_KEY
  # api_key: ""
  timeout_secs: 60
  requests_per_minute: 50

database:
  url: "sqlite:.sqlpilot/data.db"
  max_connections: 5
  query_timeout_secs: 5
  max_rows: 1000

logging:
  # trace, debug, info, warn, error
  level: "warn"
  # json | pretty
  format: "pretty"
"#;

/// Errors raised while assembling the process.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to create LLM gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Failed to open database: {0}")]
    Database(#[from] ExecutionError),
}

/// Build the LLM gateway selected by `llm.provider`.
pub fn build_gateway(config: &Config) -> Result<Arc<dyn LlmGateway>, SetupError> {
    let api_key = ConfigLoader::resolve_api_key(config)?;
    match config.llm.provider {
        LlmProvider::Anthropic => {
            let anthropic = AnthropicConfig::from_llm_config(&config.llm, api_key.unwrap_or_default());
            Ok(Arc::new(AnthropicGateway::new(anthropic)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockGateway::new())),
    }
}

/// Open the configured database. With the mock provider and no database
/// file present, an empty mock executor is used so offline runs work.
pub async fn build_executor(config: &Config) -> Result<Arc<dyn DatabaseExecutor>, SetupError> {
    if config.llm.provider == LlmProvider::Mock && !database_file_exists(&config.database.url) {
        warn!(url = %config.database.url, "Database not found; using empty mock executor");
        return Ok(Arc::new(MockExecutor::new(SchemaDescription::new("sqlite"))));
    }
    Ok(Arc::new(SqliteExecutor::connect(&config.database).await?))
}

/// Wire agents, registry and routing rules around the given ports.
pub fn assemble(
    config: &Config,
    gateway: Arc<dyn LlmGateway>,
    executor: Arc<dyn DatabaseExecutor>,
) -> Result<Orchestrator, ConfigurationError> {
    let mut builder = AgentRegistry::builder();

    let text2sql = &config.agents.text2sql;
    if text2sql.enabled {
        let settings = PipelineSettings::from_config(text2sql, &config.database);
        let agent = Text2SqlAgent::new(Text2SqlPipeline::new(gateway, executor, settings));
        builder.register_agent(Arc::new(agent), text2sql.priority)?;
    }
    if builder.is_empty() {
        return Err(ConfigurationError::NoAgentsEnabled);
    }

    let registry = builder.build()?;
    let router = TaskRouter::from_config(config)?;

    for rule in router.rules() {
        if registry.resolve(&rule.category).is_empty() {
            warn!(
                keyword = %rule.keyword,
                category = %rule.category,
                "Routing rule targets a category no agent accepts"
            );
        }
    }

    info!(
        agents = registry.len(),
        rules = router.rules().len(),
        "Orchestrator assembled"
    );
    Ok(Orchestrator::new(Arc::new(registry), Arc::new(router)))
}

/// Build the full orchestrator from configuration.
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator, SetupError> {
    let gateway = build_gateway(config)?;
    let executor = build_executor(config).await?;
    Ok(assemble(config, gateway, executor)?)
}

fn database_file_exists(url: &str) -> bool {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    path != ":memory:" && Path::new(path).exists()
}

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl SetupPaths {
    /// Paths rooted at `base`.
    pub fn in_dir(base: impl AsRef<Path>) -> Self {
        let config_dir = base.as_ref().join(CONFIG_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
        }
    }

    /// Check if sqlpilot is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Outcome of `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Overwritten,
    AlreadyInitialized,
}

/// Create `.sqlpilot/config.yaml` from the default template.
pub fn init(paths: &SetupPaths, force: bool) -> std::io::Result<InitOutcome> {
    let existed = paths.is_initialized();
    if existed && !force {
        return Ok(InitOutcome::AlreadyInitialized);
    }

    fs::create_dir_all(&paths.config_dir)?;
    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)?;

    Ok(if existed {
        InitOutcome::Overwritten
    } else {
        InitOutcome::Created
    })
}
