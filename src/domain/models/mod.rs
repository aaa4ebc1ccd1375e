pub mod agent;
pub mod category;
pub mod config;
pub mod query_result;
pub mod question;
pub mod response;
pub mod schema;
pub mod sql;

pub use agent::{AgentCapabilities, AgentDescriptor, AgentInfo};
pub use category::{MatchMode, RoutingRule, TaskCategory};
pub use config::{
    AgentsConfig, Config, DatabaseConfig, LlmConfig, LlmProvider, LogFormat, LoggingConfig,
    RotationPolicy, RoutingConfig, RoutingRuleConfig, Text2SqlConfig,
};
pub use query_result::{display_value, unique_column_labels, QueryResult, Row};
pub use question::{Question, SessionContext, Turn};
pub use response::{AgentResponse, ResponseStatus};
pub use schema::{ColumnSchema, ForeignKey, SchemaDescription, SchemaFormat, TableSchema};
pub use sql::{
    strip_code_fences, Rejection, RejectionKind, SqlCandidate, ValidationPolicy,
    ValidationVerdict,
};
