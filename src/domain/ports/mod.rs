//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - LlmGateway: "ask a model, get text back"
//! - DatabaseExecutor: schema introspection and read-only query execution
//! - Agent: a worker the orchestrator can delegate questions to
//!
//! These traits keep the domain and services independent of specific
//! providers and databases.

pub mod agent;
pub mod database_executor;
pub mod llm_gateway;

pub use agent::Agent;
pub use database_executor::DatabaseExecutor;
pub use llm_gateway::{GenerationParameters, GenerationRequest, HealthStatus, LlmGateway};
