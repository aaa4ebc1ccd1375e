//! The Text2SQL agent: adapts [`Text2SqlPipeline`] to the [`Agent`] port.

use async_trait::async_trait;
use tracing::warn;

use super::pipeline::Text2SqlPipeline;
use crate::domain::models::{AgentCapabilities, AgentResponse, Question, TaskCategory};
use crate::domain::ports::Agent;

pub const TEXT2SQL_AGENT_NAME: &str = "text2sql";

pub struct Text2SqlAgent {
    pipeline: Text2SqlPipeline,
}

impl Text2SqlAgent {
    pub const fn new(pipeline: Text2SqlPipeline) -> Self {
        Self { pipeline }
    }

    pub const fn pipeline(&self) -> &Text2SqlPipeline {
        &self.pipeline
    }
}

#[async_trait]
impl Agent for Text2SqlAgent {
    fn name(&self) -> &str {
        TEXT2SQL_AGENT_NAME
    }

    fn capabilities(&self) -> AgentCapabilities {
        AgentCapabilities {
            name: TEXT2SQL_AGENT_NAME.to_string(),
            description: "Converts natural language questions to SQL queries and executes them"
                .to_string(),
            categories: vec![TaskCategory::Sql, TaskCategory::Query, TaskCategory::Database],
            input_format: "question: natural language question".to_string(),
            output_format: "answer: natural language answer; sql: query used to produce it"
                .to_string(),
        }
    }

    async fn run(&self, question: &Question) -> AgentResponse {
        let outcome = self.pipeline.execute(question).await;
        let attempts = outcome.run.attempts;

        let response = match outcome.result {
            Ok(answer) => AgentResponse::success(answer.text, answer.sql, answer.result),
            Err(err) => {
                warn!(question_id = %question.id, status = %err.status(), error = %err, "Text2SQL run failed");
                AgentResponse::failure(err.status(), err.user_message())
                    .with_sql(outcome.run.reported_sql())
            }
        };
        response.with_agent(TEXT2SQL_AGENT_NAME).with_attempts(attempts)
    }

    async fn health_check(&self) -> bool {
        let gateway = self.pipeline.gateway().health_check().await;
        let database = self.pipeline.executor().ping().await;
        if let Err(err) = &database {
            warn!(error = %err, "Database ping failed");
        }
        gateway.is_usable() && database.is_ok()
    }
}
