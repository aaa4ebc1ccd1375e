//! Mock executor for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{QueryResult, SchemaDescription};
use crate::domain::ports::DatabaseExecutor;

/// Executor with a canned schema and scripted results.
///
/// Scripted results are consumed in order; afterwards the default result
/// (empty unless set) is returned. Artificial latency counts against the
/// caller's timeout exactly like a slow query would.
pub struct MockExecutor {
    schema: SchemaDescription,
    schema_error: Option<ExecutionError>,
    script: Mutex<VecDeque<Result<QueryResult, ExecutionError>>>,
    default_result: QueryResult,
    latency: Option<Duration>,
    reachable: bool,
    executed: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new(schema: SchemaDescription) -> Self {
        Self {
            schema,
            schema_error: None,
            script: Mutex::new(VecDeque::new()),
            default_result: QueryResult::new(Vec::new(), Vec::new()),
            latency: None,
            reachable: true,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(self, result: QueryResult) -> Self {
        self.push(Ok(result));
        self
    }

    pub fn with_error(self, error: ExecutionError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn with_default_result(mut self, result: QueryResult) -> Self {
        self.default_result = result;
        self
    }

    pub fn with_schema_error(mut self, error: ExecutionError) -> Self {
        self.schema_error = Some(error);
        self
    }

    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `ping` fail.
    pub const fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn push(&self, result: Result<QueryResult, ExecutionError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Statements passed to `execute`, oldest first.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn execute_count(&self) -> usize {
        self.executed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl DatabaseExecutor for MockExecutor {
    fn dialect(&self) -> &str {
        &self.schema.dialect
    }

    async fn describe_schema(&self) -> Result<SchemaDescription, ExecutionError> {
        match &self.schema_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.schema.clone()),
        }
    }

    async fn execute(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ExecutionError> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());

        if let Some(latency) = self.latency {
            tokio::time::timeout(timeout, tokio::time::sleep(latency))
                .await
                .map_err(|_| ExecutionError::Timeout(timeout))?;
        }

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_result.clone()))
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ExecutionError::Connection("mock database unreachable".to_string()))
        }
    }
}
