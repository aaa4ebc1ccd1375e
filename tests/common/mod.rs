//! Common test utilities for integration tests
//!
//! Deterministic stand-ins for the LLM gateway and database, plus helpers to
//! wire them into an orchestrator the way setup does.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;

use sqlpilot::adapters::database::MockExecutor;
use sqlpilot::adapters::gateways::MockGateway;
use sqlpilot::domain::models::{
    ColumnSchema, Config, QueryResult, Row, SchemaDescription, TableSchema,
};
use sqlpilot::infrastructure::setup;
use sqlpilot::Orchestrator;

/// Schema with `users` and `orders` tables.
pub fn shop_schema() -> SchemaDescription {
    SchemaDescription::new("sqlite")
        .with_table(
            TableSchema::new("users")
                .with_column(ColumnSchema::new("id", "INTEGER").not_null())
                .with_column(ColumnSchema::new("name", "TEXT"))
                .with_column(ColumnSchema::new("email", "TEXT")),
        )
        .with_table(
            TableSchema::new("orders")
                .with_column(ColumnSchema::new("id", "INTEGER").not_null())
                .with_column(ColumnSchema::new("user_id", "INTEGER"))
                .with_column(ColumnSchema::new("total", "REAL")),
        )
}

/// A one-row, one-column result `{count: n}`.
pub fn count_result(n: i64) -> QueryResult {
    let mut row = Row::new();
    row.insert("count".into(), json!(n));
    QueryResult::new(vec!["count".into()], vec![row])
}

/// Configuration with a single `how many -> text2sql` rule.
pub fn how_many_config() -> Config {
    let mut config = Config::default();
    config
        .task_routing
        .insert("how many".to_string(), "text2sql".to_string());
    config
}

/// Assemble an orchestrator around the given stubs.
pub fn orchestrator(
    config: &Config,
    gateway: Arc<MockGateway>,
    executor: Arc<MockExecutor>,
) -> Orchestrator {
    setup::assemble(config, gateway, executor).expect("test configuration should assemble")
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
