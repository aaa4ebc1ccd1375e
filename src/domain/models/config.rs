use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::category::MatchMode;

/// Main configuration structure for sqlpilot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Keyword -> category token or agent name
    #[serde(default)]
    pub task_routing: BTreeMap<String, String>,

    /// Routing behaviour and prioritised rules
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-agent settings
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Language model gateway
    #[serde(default)]
    pub llm: LlmConfig,

    /// Target database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Routing configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingConfig {
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Explicit rules, evaluated together with `task_routing` entries
    #[serde(default)]
    pub rules: Vec<RoutingRuleConfig>,
}

/// A configured routing rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingRuleConfig {
    pub keyword: String,
    /// Category token (`sql`, `query`, `database`) or agent name
    pub target: String,
    #[serde(default)]
    pub priority: i32,
}

/// Agent settings keyed by agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentsConfig {
    #[serde(default)]
    pub text2sql: Text2SqlConfig,
}

/// Text2SQL agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Text2SqlConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Registry priority; higher wins when several agents accept a category
    #[serde(default = "default_agent_priority")]
    pub priority: u32,

    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for SQL generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for answer formatting
    #[serde(default = "default_format_temperature")]
    pub format_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extra generation attempts after the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Results with at most this many rows are answered from a template
    #[serde(default = "default_template_row_threshold")]
    pub template_row_threshold: usize,

    #[serde(default = "default_true")]
    pub check_references: bool,

    #[serde(default = "default_max_sql_length")]
    pub max_sql_length: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_agent_priority() -> u32 {
    100
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_temperature() -> f32 {
    0.1
}

const fn default_format_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_template_row_threshold() -> usize {
    1
}

const fn default_max_sql_length() -> usize {
    10_000
}

impl Default for Text2SqlConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            priority: default_agent_priority(),
            model: default_model(),
            temperature: default_temperature(),
            format_temperature: default_format_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            template_row_threshold: default_template_row_threshold(),
            check_references: default_true(),
            max_sql_length: default_max_sql_length(),
        }
    }
}

/// LLM provider selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    Mock,
}

/// LLM gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    /// API key; falls back to `ANTHROPIC_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

const fn default_llm_timeout_secs() -> u64 {
    60
}

const fn default_requests_per_minute() -> u32 {
    50
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_llm_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// `SQLite` connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Deadline for one query, including connection acquisition
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Rows read before a result is truncated
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_database_url() -> String {
    "sqlite:.sqlpilot/data.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_query_timeout_secs() -> u64 {
    5
}

const fn default_max_rows() -> usize {
    1000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            query_timeout_secs: default_query_timeout_secs(),
            max_rows: default_max_rows(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
