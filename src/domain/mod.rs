//! Domain layer for sqlpilot
//!
//! Core models, error taxonomy and the port traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    ConfigurationError, ExecutionError, FormattingError, GatewayError, PipelineError,
    UnroutedError,
};
