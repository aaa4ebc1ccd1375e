//! sqlpilot - natural-language questions answered with validated SQL
//!
//! An orchestrator classifies each question with keyword rules, picks the
//! highest-priority registered agent for the category, and delegates. The
//! Text2SQL agent generates SQL through an LLM gateway, validates it as a
//! single read-only statement, runs it against the database under a
//! deadline, and phrases the result as an answer.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors, and the gateway, executor and agent ports
//! - **Service Layer** (`services`): orchestrator, registry, router, validator, Text2SQL
//! - **Adapters** (`adapters`): Anthropic and mock gateways, `SQLite` and mock executors
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, assembly
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use sqlpilot::infrastructure::{config::ConfigLoader, setup};
//! use sqlpilot::SessionContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let orchestrator = setup::build_orchestrator(&config).await?;
//!     let response = orchestrator
//!         .process_question("How many users are there?", SessionContext::default())
//!         .await;
//!     println!("{}", response.answer);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{
    ConfigurationError, ExecutionError, FormattingError, GatewayError, PipelineError,
    UnroutedError,
};
pub use domain::models::{
    AgentResponse, Config, Question, QueryResult, ResponseStatus, SchemaDescription,
    SessionContext, SqlCandidate, TaskCategory, ValidationPolicy, ValidationVerdict,
};
pub use domain::ports::{Agent, DatabaseExecutor, LlmGateway};
pub use infrastructure::config::ConfigLoader;
pub use services::{AgentRegistry, Orchestrator, SqlValidator, TaskRouter};
