//! Normalised responses returned to callers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::query_result::QueryResult;

/// Terminal status carried by every [`AgentResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseStatus {
    Success,
    Unrouted,
    GenerationFailed,
    ValidationFailed,
    ExecutionFailed,
    ExecutionTimeout,
}

impl ResponseStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unrouted => "unrouted",
            Self::GenerationFailed => "generation-failed",
            Self::ValidationFailed => "validation-failed",
            Self::ExecutionFailed => "execution-failed",
            Self::ExecutionTimeout => "execution-timeout",
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single value an orchestrator call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Natural-language answer, or a plain explanation of the failure.
    pub answer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,

    pub status: ResponseStatus,

    /// Agent that handled the request; absent when nothing was routed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Generation attempts consumed.
    #[serde(default)]
    pub attempts: u32,
}

impl AgentResponse {
    pub fn success(answer: impl Into<String>, sql: impl Into<String>, result: QueryResult) -> Self {
        Self {
            answer: answer.into(),
            sql: Some(sql.into()),
            result: Some(result),
            status: ResponseStatus::Success,
            agent: None,
            attempts: 0,
        }
    }

    pub fn failure(status: ResponseStatus, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sql: None,
            result: None,
            status,
            agent: None,
            attempts: 0,
        }
    }

    pub fn unrouted(answer: impl Into<String>) -> Self {
        Self::failure(ResponseStatus::Unrouted, answer)
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_sql(mut self, sql: Option<String>) -> Self {
        self.sql = sql;
        self
    }

    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
