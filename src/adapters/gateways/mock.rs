//! Mock gateway for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::GatewayError;
use crate::domain::ports::{GenerationRequest, HealthStatus, LlmGateway};

const DEFAULT_REPLY: &str = "SELECT 1 AS result;";

/// Deterministic gateway: scripted replies are consumed in order, then the
/// default reply is returned for every further call. Every request is
/// recorded.
pub struct MockGateway {
    script: Mutex<VecDeque<Result<String, GatewayError>>>,
    default_reply: String,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
    health: HealthStatus,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_reply: DEFAULT_REPLY.to_string(),
            requests: Mutex::new(Vec::new()),
            delay: None,
            health: HealthStatus::Healthy,
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: GatewayError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Sleep this long before answering.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub const fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    pub fn push(&self, reply: Result<String, GatewayError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for MockGateway {
    fn gateway_id(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_reply.clone()))
    }

    async fn health_check(&self) -> HealthStatus {
        self.health
    }
}
