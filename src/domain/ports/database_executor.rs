//! Database Executor Port

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{QueryResult, SchemaDescription};

/// Read-only access to the target database.
///
/// `execute` must apply `timeout` to connection acquisition and the query
/// together, and release any pooled connection on every exit path.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    /// Dialect name used in prompts (e.g., "sqlite")
    fn dialect(&self) -> &str;

    /// Describe tables, columns and foreign keys
    async fn describe_schema(&self) -> Result<SchemaDescription, ExecutionError>;

    /// Run an already validated statement
    ///
    /// # Errors
    /// - `ExecutionError::Timeout` - The deadline elapsed
    /// - `ExecutionError::Connection` - No connection could be obtained
    /// - `ExecutionError::Query` - The database rejected the statement
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ExecutionError>;

    /// Check connectivity
    async fn ping(&self) -> Result<(), ExecutionError>;
}
