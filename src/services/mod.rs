//! Application services: registry, routing, validation, the Text2SQL agent
//! and the orchestrator that ties them together.

pub mod agent_registry;
pub mod orchestrator;
pub mod sql_validator;
pub mod task_router;
pub mod text2sql;

pub use agent_registry::{AgentRegistry, AgentRegistryBuilder};
pub use orchestrator::{AgentHealth, HealthReport, Orchestrator, OrchestratorStats, RouteDecision};
pub use sql_validator::{validate_sql, SqlValidator};
pub use task_router::{Classification, TaskRouter};
pub use text2sql::{Text2SqlAgent, Text2SqlPipeline};
