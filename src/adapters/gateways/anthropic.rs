//! Anthropic Messages API gateway.
//!
//! Makes direct HTTP calls to `POST /v1/messages`. Requests are throttled
//! through a `governor` rate limiter, and error bodies are scrubbed of
//! credentials before they are logged or returned.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::errors::GatewayError;
use crate::domain::models::LlmConfig;
use crate::domain::ports::{GenerationRequest, HealthStatus, LlmGateway};
use crate::infrastructure::logging::SecretScrubber;

const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic gateway.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// API base URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl AnthropicConfig {
    pub fn from_llm_config(config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            requests_per_minute: config.requests_per_minute,
        }
    }
}

/// Message role in Anthropic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

impl MessagesRequest {
    /// History turns become alternating user/assistant messages ahead of
    /// the prompt.
    pub fn from_generation(request: &GenerationRequest) -> Self {
        let mut messages = Vec::with_capacity(request.history.len() * 2 + 1);
        for turn in &request.history {
            messages.push(Message {
                role: MessageRole::User,
                content: turn.question.clone(),
            });
            messages.push(Message {
                role: MessageRole::Assistant,
                content: turn.answer.clone(),
            });
        }
        messages.push(Message {
            role: MessageRole::User,
            content: request.prompt.clone(),
        });

        Self {
            model: request.parameters.model.clone(),
            max_tokens: request.parameters.max_tokens,
            system: request.system.clone(),
            messages,
            temperature: request.parameters.temperature,
        }
    }
}

/// Content block in a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Anthropic API gateway.
pub struct AnthropicGateway {
    client: Client,
    base_url: String,
    timeout_secs: u64,
    limiter: DefaultDirectRateLimiter,
    scrubber: SecretScrubber,
}

impl AnthropicGateway {
    pub fn new(config: AnthropicConfig) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured("ANTHROPIC_API_KEY not set".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        let mut api_key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|_| GatewayError::NotConfigured("API key contains invalid characters".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert("anthropic-version", header::HeaderValue::from_static(API_VERSION));
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            scrubber: SecretScrubber::new(),
        })
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::Transport(self.scrubber.scrub(&err.to_string()))
        }
    }

    /// Handle error response and classify error type
    async fn error_from_response(&self, response: Response) -> GatewayError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        let message = self.scrubber.scrub(&message);

        warn!(status = %status, message = %message, "Anthropic API error");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                GatewayError::Timeout(self.timeout_secs)
            }
            other => GatewayError::Api {
                status: other.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    fn gateway_id(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.parameters.model, max_tokens = request.parameters.max_tokens))]
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        self.limiter.until_ready().await;

        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, "POST messages");

        let body = MessagesRequest::from_generation(&request);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        debug!(stop_reason = parsed.stop_reason.as_deref(), chars = text.len(), "Received completion");
        Ok(text)
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/v1/models?limit=1", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => HealthStatus::Healthy,
            Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                HealthStatus::Degraded
            }
            Ok(response) => {
                warn!(status = %response.status(), "Anthropic health check failed");
                HealthStatus::Unavailable
            }
            Err(err) => {
                warn!(error = %self.scrubber.scrub(&err.to_string()), "Anthropic unreachable");
                HealthStatus::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Turn;
    use crate::domain::ports::GenerationParameters;

    #[test]
    fn test_request_includes_history_in_order() {
        let request = GenerationRequest::new("And orders?", GenerationParameters::default())
            .with_system("You write SQL")
            .with_history(vec![Turn::new("How many users?", "42")]);
        let body = MessagesRequest::from_generation(&request);

        assert_eq!(body.messages.len(), 3);
        assert_eq!(body.messages[0].role, MessageRole::User);
        assert_eq!(body.messages[1].role, MessageRole::Assistant);
        assert_eq!(body.messages[2].content, "And orders?");
        assert_eq!(body.system.as_deref(), Some("You write SQL"));
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let config = AnthropicConfig {
            api_key: "  ".into(),
            base_url: "http://localhost".into(),
            timeout_secs: 5,
            requests_per_minute: 10,
        };
        assert!(matches!(AnthropicGateway::new(config), Err(GatewayError::NotConfigured(_))));
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"SELECT "},{"type":"tool_use","id":"x"},{"type":"text","text":"1;"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "SELECT 1;");
    }
}
