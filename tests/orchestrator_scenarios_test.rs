//! End-to-end orchestrator scenarios with deterministic stubs.

mod common;

use std::sync::Arc;
use std::time::Duration;

use sqlpilot::adapters::database::MockExecutor;
use sqlpilot::adapters::gateways::MockGateway;
use sqlpilot::domain::errors::GatewayError;
use sqlpilot::domain::models::{ResponseStatus, SessionContext, Turn};

use common::{count_result, how_many_config, orchestrator, setup_test_logging, shop_schema};

#[tokio::test]
async fn scenario_count_question_is_answered() {
    setup_test_logging();
    let gateway = Arc::new(MockGateway::new().with_reply("SELECT COUNT(*) FROM users"));
    let executor = Arc::new(MockExecutor::new(shop_schema()).with_result(count_result(42)));
    let orchestrator = orchestrator(&how_many_config(), gateway.clone(), executor.clone());

    let response = orchestrator
        .process_question("How many users are there?", SessionContext::new("session-a"))
        .await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.sql.as_deref(), Some("SELECT COUNT(*) FROM users;"));
    assert!(response.answer.contains("42"), "answer was: {}", response.answer);
    assert_eq!(response.agent.as_deref(), Some("text2sql"));
    let result = response.result.expect("result should be present");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["count"], 42);

    // Single-row results are answered from the template, so one model call.
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(executor.executed(), vec!["SELECT COUNT(*) FROM users;".to_string()]);
    assert!(gateway.requests()[0].prompt.contains("users"));
}

#[tokio::test]
async fn scenario_destructive_sql_is_rejected_without_execution() {
    let gateway = Arc::new(MockGateway::new().with_default_reply("DROP TABLE users;"));
    let executor = Arc::new(MockExecutor::new(shop_schema()));
    let orchestrator = orchestrator(&how_many_config(), gateway.clone(), executor.clone());

    let response = orchestrator
        .process_question("How many users would be left if we drop them?", SessionContext::default())
        .await;

    assert_eq!(response.status, ResponseStatus::ValidationFailed);
    assert!(response.result.is_none());
    assert_eq!(executor.execute_count(), 0);
    // Unsafe statements are unrecoverable.
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_slow_query_times_out() {
    let gateway = Arc::new(MockGateway::new().with_reply("SELECT COUNT(*) FROM orders"));
    let executor = Arc::new(
        MockExecutor::new(shop_schema())
            .with_result(count_result(7))
            .with_latency(Duration::from_secs(30)),
    );
    let mut config = how_many_config();
    config.database.query_timeout_secs = 5;
    let orchestrator = orchestrator(&config, gateway.clone(), executor.clone());

    let response = orchestrator
        .process_question("How many orders were placed?", SessionContext::default())
        .await;

    assert_eq!(response.status, ResponseStatus::ExecutionTimeout);
    assert!(response.result.is_none());
    assert_eq!(executor.execute_count(), 1);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn scenario_unmatched_question_is_unrouted() {
    let gateway = Arc::new(MockGateway::new());
    let executor = Arc::new(MockExecutor::new(shop_schema()));
    let orchestrator = orchestrator(&how_many_config(), gateway.clone(), executor.clone());

    let response = orchestrator
        .process_question("Write me a poem about autumn", SessionContext::default())
        .await;

    assert_eq!(response.status, ResponseStatus::Unrouted);
    assert!(!response.answer.is_empty());
    assert!(response.sql.is_none());
    assert_eq!(gateway.call_count(), 0);
    assert_eq!(executor.execute_count(), 0);
}

#[tokio::test]
async fn generation_failures_exhaust_the_budget() {
    let gateway = Arc::new(
        MockGateway::new()
            .with_error(GatewayError::RateLimited("slow down".into()))
            .with_error(GatewayError::Timeout(60))
            .with_error(GatewayError::EmptyResponse)
            .with_default_reply("SELECT 1;"),
    );
    let executor = Arc::new(MockExecutor::new(shop_schema()));
    let orchestrator = orchestrator(&how_many_config(), gateway.clone(), executor.clone());

    let response = orchestrator
        .process_question("How many users?", SessionContext::default())
        .await;

    assert_eq!(response.status, ResponseStatus::GenerationFailed);
    assert_eq!(gateway.call_count(), 3);
    assert_eq!(response.attempts, 3);
    assert_eq!(executor.execute_count(), 0);
}

#[tokio::test]
async fn session_history_reaches_the_gateway() {
    let gateway = Arc::new(MockGateway::new().with_reply("SELECT COUNT(*) FROM orders"));
    let executor = Arc::new(MockExecutor::new(shop_schema()).with_result(count_result(3)));
    let orchestrator = orchestrator(&how_many_config(), gateway.clone(), executor);

    let session =
        SessionContext::new("s-42").with_turn(Turn::new("How many users?", "There are 2 users."));
    let response = orchestrator.process_question("How many orders?", session).await;

    assert!(response.is_success());
    let request = &gateway.requests()[0];
    assert_eq!(request.history.len(), 1);
    assert_eq!(request.history[0].answer, "There are 2 users.");
}

#[tokio::test]
async fn serialized_unrouted_response_omits_absent_fields() {
    let gateway = Arc::new(MockGateway::new());
    let executor = Arc::new(MockExecutor::new(shop_schema()));
    let orchestrator = orchestrator(&how_many_config(), gateway, executor);

    let response = orchestrator
        .process_question("Tell me a joke", SessionContext::default())
        .await;
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["status"], "unrouted");
    assert!(json.get("sql").is_none());
    assert!(json.get("result").is_none());
}
