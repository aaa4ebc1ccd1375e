//! LLM Gateway Port
//!
//! The single capability the pipeline needs from a language model: send a
//! prompt, get text back. Adapters decide transport, authentication and rate
//! limiting; the pipeline only sees [`GatewayError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GatewayError;
use crate::domain::models::Turn;

/// Sampling parameters for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Model identifier (e.g., "claude-sonnet-4-5-20250929")
    pub model: String,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

/// Request to generate text
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Final user message
    pub prompt: String,

    /// Optional system prompt
    pub system: Option<String>,

    /// Prior conversation turns, oldest first
    pub history: Vec<Turn>,

    pub parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, parameters: GenerationParameters) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            history: Vec::new(),
            parameters,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// Health status of a gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Gateway is configured and reachable
    Healthy,

    /// Gateway is usable but degraded (e.g., rate limited)
    Degraded,

    /// Gateway cannot serve requests
    Unavailable,
}

impl HealthStatus {
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Port trait for language model gateways
///
/// Implementations must be `Send + Sync` for concurrent use across tokio tasks.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Identifier recorded as the provenance of generated SQL
    ///
    /// Examples: "anthropic", "mock"
    fn gateway_id(&self) -> &str;

    /// Generate text for `request`
    ///
    /// # Errors
    /// - `GatewayError::Timeout` - The call exceeded its deadline
    /// - `GatewayError::RateLimited` - Provider quota exhausted
    /// - `GatewayError::Auth` - Credentials rejected
    /// - `GatewayError::Transport` - The provider could not be reached
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;

    /// Check whether the gateway can serve requests
    async fn health_check(&self) -> HealthStatus;
}
