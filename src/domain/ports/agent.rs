//! Agent Port

use async_trait::async_trait;

use crate::domain::models::{AgentCapabilities, AgentResponse, Question};

/// A specialised worker the orchestrator can delegate a question to.
///
/// `run` never fails: every outcome, including failures, is reported as a
/// status-tagged [`AgentResponse`].
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> AgentCapabilities;

    async fn run(&self, question: &Question) -> AgentResponse;

    /// Whether the agent's collaborators are reachable
    async fn health_check(&self) -> bool;
}
