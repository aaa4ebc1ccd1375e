//! Domain errors for the sqlpilot question-answering pipeline.
//!
//! Only [`ConfigurationError`] is fatal: it is raised while the process is
//! being assembled and stops it from serving. Every other error kind is caught
//! at the boundary of an agent run or an orchestrator call and converted into
//! a status-tagged [`AgentResponse`](super::models::AgentResponse).

use std::time::Duration;

use thiserror::Error;

use super::models::{Rejection, ResponseStatus, TaskCategory};

/// Start-up errors: malformed configuration, routing rules or registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Agent registry is empty; at least one agent must be registered")]
    EmptyRegistry,

    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),

    #[error("Invalid agent '{name}': {reason}")]
    InvalidAgent { name: String, reason: String },

    #[error("Invalid routing rule: {0}")]
    InvalidRoutingRule(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown LLM provider: {0}. Must be one of: anthropic, mock")]
    UnknownProvider(String),

    #[error("Missing API key for provider '{0}' (set llm.api_key or ANTHROPIC_API_KEY)")]
    MissingApiKey(String),

    #[error("No agents are enabled in configuration")]
    NoAgentsEnabled,

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<figment::Error> for ConfigurationError {
    fn from(err: figment::Error) -> Self {
        Self::Load(err.to_string())
    }
}

/// Errors surfaced by an LLM gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Gateway request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether repeating the same call could plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited(_) | Self::Transport(_) | Self::EmptyResponse => {
                true
            }
            Self::Api { status, .. } => *status >= 500,
            Self::NotConfigured(_) | Self::Auth(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Errors surfaced by a database executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Query exceeded its deadline of {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Schema introspection failed: {0}")]
    Schema(String),
}

impl ExecutionError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<sqlx::Error> for ExecutionError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Answer formatting failures. Never fatal: the pipeline falls back to a
/// generic summary of the raw result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormattingError {
    #[error("Formatting call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Formatting produced no text")]
    Empty,
}

/// No registered agent accepts the classified category.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("No agent is registered for task category '{category}'")]
pub struct UnroutedError {
    pub category: TaskCategory,
}

/// Terminal failure of a Text2SQL run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("SQL generation failed after {attempts} attempt(s): {reason}")]
    Generation { attempts: u32, reason: String },

    #[error("Generated SQL rejected: {0}")]
    Validation(Rejection),

    #[error("Query execution failed: {0}")]
    Execution(ExecutionError),

    #[error("Database schema unavailable: {0}")]
    Schema(ExecutionError),
}

impl PipelineError {
    /// Response status reported for this failure.
    pub const fn status(&self) -> ResponseStatus {
        match self {
            Self::Generation { .. } => ResponseStatus::GenerationFailed,
            Self::Validation(_) => ResponseStatus::ValidationFailed,
            Self::Execution(err) if err.is_timeout() => ResponseStatus::ExecutionTimeout,
            Self::Execution(_) | Self::Schema(_) => ResponseStatus::ExecutionFailed,
        }
    }

    /// Plain-language explanation shown to the caller.
    pub fn user_message(&self) -> String {
        match self {
            Self::Generation { attempts, .. } => format!(
                "I could not turn your question into a SQL query after {attempts} attempt(s). \
                 Try rephrasing it or naming the tables involved."
            ),
            Self::Validation(rejection) if rejection.recoverable => format!(
                "I could not produce a valid query for your question ({}).",
                rejection.message
            ),
            Self::Validation(rejection) => format!(
                "I could not safely execute the generated query: {}.",
                rejection.message
            ),
            Self::Execution(ExecutionError::Timeout(limit)) => format!(
                "The query took longer than the allowed {}s and was abandoned.",
                limit.as_secs_f64()
            ),
            Self::Execution(err) => format!("The database could not run the generated query: {err}."),
            Self::Schema(_) => {
                "I could not read the database schema, so no query was attempted.".to_string()
            }
        }
    }
}
