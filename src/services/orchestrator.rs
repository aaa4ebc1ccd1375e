//! Orchestrator: classify, select, delegate, normalise.
//!
//! Every call returns an [`AgentResponse`]. Unrouted questions, agent
//! failures and agent panics are all turned into status-tagged responses.

use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};

use super::agent_registry::AgentRegistry;
use super::task_router::{Classification, TaskRouter};
use crate::domain::errors::UnroutedError;
use crate::domain::models::{
    AgentDescriptor, AgentInfo, AgentResponse, MatchMode, Question, ResponseStatus, SessionContext,
    TaskCategory,
};

/// A pure routing decision.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub classification: Classification,
    /// Selected agent, if any accepts the category.
    pub agent: Option<String>,
}

impl RouteDecision {
    pub const fn category(&self) -> &TaskCategory {
        &self.classification.category
    }
}

/// Static facts about the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    pub agents: usize,
    pub routing_rules: usize,
    pub match_mode: MatchMode,
    pub agent_names: Vec<String>,
}

/// Per-agent health result.
#[derive(Debug, Clone, Serialize)]
pub struct AgentHealth {
    pub name: String,
    pub healthy: bool,
}

/// Aggregate health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub agents: Vec<AgentHealth>,
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    router: Arc<TaskRouter>,
}

impl Orchestrator {
    pub const fn new(registry: Arc<AgentRegistry>, router: Arc<TaskRouter>) -> Self {
        Self { registry, router }
    }

    /// Caller-facing entry point: build a question from text and context,
    /// then process it.
    pub async fn process_question(&self, text: &str, session: SessionContext) -> AgentResponse {
        let question = Question::with_context(text, session);
        self.process(&question).await
    }

    pub async fn process(&self, question: &Question) -> AgentResponse {
        let span = info_span!(
            "process_question",
            question_id = %question.id,
            session_id = question.session_id.as_deref().unwrap_or("-"),
        );
        self.dispatch(question).instrument(span).await
    }

    async fn dispatch(&self, question: &Question) -> AgentResponse {
        let decision = self.route(question);
        let category = decision.category().clone();

        let Some(descriptor) = decision.agent.as_deref().and_then(|name| self.registry.get(name)) else {
            let err = UnroutedError { category };
            info!(category = %err.category, "Question not routed");
            return AgentResponse::unrouted(format!(
                "I can't help with that question: {err}. Try asking about the data in the database, \
                 for example \"How many users are there?\"."
            ));
        };

        info!(
            category = %category,
            agent = %descriptor.name,
            rule = decision.classification.matched_rule.as_ref().map(|r| r.keyword.as_str()),
            "Routing question"
        );
        self.delegate(descriptor, question).await
    }

    async fn delegate(&self, descriptor: &AgentDescriptor, question: &Question) -> AgentResponse {
        let run = std::panic::AssertUnwindSafe(descriptor.handle.run(question)).catch_unwind();
        let response = match run.await {
            Ok(response) => response,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(agent = %descriptor.name, panic = %message, "Agent panicked");
                AgentResponse::failure(
                    ResponseStatus::ExecutionFailed,
                    "An internal error occurred while answering your question.",
                )
            }
        };

        let response = match response.agent {
            Some(_) => response,
            None => response.with_agent(descriptor.name.clone()),
        };
        info!(status = %response.status, attempts = response.attempts, "Question processed");
        response
    }

    /// Classify and select without invoking any agent.
    pub fn route(&self, question: &Question) -> RouteDecision {
        let classification = self.router.classify(question);
        let agent = self
            .registry
            .select(&classification.category)
            .map(|d| d.name.clone());
        RouteDecision {
            classification,
            agent,
        }
    }

    /// Registered agents in priority order.
    pub fn list_agents(&self) -> Vec<AgentInfo> {
        self.registry.all().iter().map(AgentDescriptor::info).collect()
    }

    /// `true` iff at least one agent is registered and every agent is healthy.
    pub async fn health_check(&self) -> bool {
        self.health_report().await.healthy
    }

    pub async fn health_report(&self) -> HealthReport {
        let checks = self.registry.all().iter().map(|descriptor| async move {
            let healthy = std::panic::AssertUnwindSafe(descriptor.handle.health_check())
                .catch_unwind()
                .await
                .unwrap_or(false);
            if !healthy {
                warn!(agent = %descriptor.name, "Agent reported unhealthy");
            }
            AgentHealth {
                name: descriptor.name.clone(),
                healthy,
            }
        });
        let agents = futures::future::join_all(checks).await;
        let healthy = !agents.is_empty() && agents.iter().all(|a| a.healthy);
        HealthReport { healthy, agents }
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            agents: self.registry.len(),
            routing_rules: self.router.rules().len(),
            match_mode: self.router.match_mode(),
            agent_names: self.registry.all().iter().map(|a| a.name.clone()).collect(),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::models::{AgentCapabilities, RoutingRule};
    use crate::domain::ports::Agent;

    struct CountingAgent {
        name: &'static str,
        calls: AtomicUsize,
        panics: bool,
    }

    impl CountingAgent {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, calls: AtomicUsize::new(0), panics: false })
        }

        fn panicking(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, calls: AtomicUsize::new(0), panics: true })
        }
    }

    #[async_trait]
    impl Agent for CountingAgent {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> AgentCapabilities {
            AgentCapabilities {
                name: self.name.to_string(),
                description: "test agent".into(),
                categories: vec![TaskCategory::Sql],
                input_format: "text".into(),
                output_format: "text".into(),
            }
        }

        async fn run(&self, _question: &Question) -> AgentResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!self.panics, "agent blew up");
            AgentResponse::failure(ResponseStatus::GenerationFailed, "could not generate")
        }

        async fn health_check(&self) -> bool {
            !self.panics
        }
    }

    fn orchestrator(agents: &[Arc<CountingAgent>], rules: Vec<RoutingRule>) -> Orchestrator {
        let mut builder = AgentRegistry::builder();
        for (i, agent) in agents.iter().enumerate() {
            builder.register_agent(agent.clone(), 100 - u32::try_from(i).unwrap()).unwrap();
        }
        Orchestrator::new(
            Arc::new(builder.build().unwrap()),
            Arc::new(TaskRouter::new(rules, MatchMode::Substring).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_unrouted_never_invokes_agent() {
        let agent = CountingAgent::new("text2sql");
        let orchestrator = orchestrator(
            &[agent.clone()],
            vec![RoutingRule::new("how many", TaskCategory::from_target("text2sql"), 0)],
        );

        let response = orchestrator.process(&Question::new("Tell me a joke")).await;
        assert_eq!(response.status, ResponseStatus::Unrouted);
        assert!(response.answer.contains("unknown"));
        assert!(response.agent.is_none());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_agent_status_passes_through() {
        let agent = CountingAgent::new("text2sql");
        let orchestrator = orchestrator(
            &[agent.clone()],
            vec![RoutingRule::new("how many", TaskCategory::Sql, 0)],
        );

        let response = orchestrator
            .process_question("How many users?", SessionContext::new("s1"))
            .await;
        assert_eq!(response.status, ResponseStatus::GenerationFailed);
        assert_eq!(response.agent.as_deref(), Some("text2sql"));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_execution_failed() {
        let agent = CountingAgent::panicking("fragile");
        let orchestrator = orchestrator(
            &[agent.clone()],
            vec![RoutingRule::new("users", TaskCategory::Sql, 0)],
        );

        let response = orchestrator.process(&Question::new("list users")).await;
        assert_eq!(response.status, ResponseStatus::ExecutionFailed);
        assert_eq!(response.agent.as_deref(), Some("fragile"));
        assert!(!orchestrator.health_check().await);
    }

    #[test]
    fn test_route_is_pure_and_prefers_priority() {
        let first = CountingAgent::new("primary");
        let second = CountingAgent::new("secondary");
        let orchestrator = orchestrator(
            &[first.clone(), second.clone()],
            vec![
                RoutingRule::new("users", TaskCategory::Sql, 0),
                RoutingRule::new("secondary", TaskCategory::from_target("secondary"), 5),
            ],
        );

        let decision = orchestrator.route(&Question::new("count users"));
        assert_eq!(decision.agent.as_deref(), Some("primary"));
        assert_eq!(orchestrator.route(&Question::new("count users")).agent, decision.agent);

        let direct = orchestrator.route(&Question::new("ask secondary about users"));
        assert_eq!(direct.agent.as_deref(), Some("secondary"));
        assert_eq!(first.calls.load(Ordering::SeqCst) + second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_agents_and_stats() {
        let orchestrator = orchestrator(
            &[CountingAgent::new("a"), CountingAgent::new("b")],
            vec![RoutingRule::new("x", TaskCategory::Sql, 0)],
        );

        let names: Vec<_> = orchestrator.list_agents().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let stats = orchestrator.stats();
        assert_eq!(stats.agents, 2);
        assert_eq!(stats.routing_rules, 1);
        assert!(orchestrator.health_check().await);
    }
}
