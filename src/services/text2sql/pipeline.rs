//! The Text2SQL state machine.
//!
//! ```text
//! Received -> Generating -> Validating -> Executing -> Formatting -> Completed
//!                 ^              |
//!                 |              v
//!                 +------- Regenerating
//! ```
//!
//! `Failed` is reachable from every state. Gateway errors, empty model output
//! and recoverable rejections all consume the same attempt budget of
//! `max_retries + 1`. Execution is never retried.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::formatter::AnswerFormatter;
use super::prompts::{sql_generation_prompt, SQL_SYSTEM_PROMPT};
use crate::domain::errors::PipelineError;
use crate::domain::models::{
    DatabaseConfig, QueryResult, Question, Rejection, ResponseStatus, SchemaFormat, SqlCandidate,
    Text2SqlConfig, ValidationPolicy,
};
use crate::domain::ports::{DatabaseExecutor, GenerationParameters, GenerationRequest, LlmGateway};
use crate::services::sql_validator::SqlValidator;

/// States of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "status")]
pub enum PipelineState {
    Received,
    Generating,
    Validating,
    Regenerating,
    Executing,
    Formatting,
    Completed,
    Failed(ResponseStatus),
}

impl PipelineState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Visible state of a run: current state, attempt counter, last rejection
/// and the full transition trace.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_rejection: Option<Rejection>,
    pub last_candidate: Option<SqlCandidate>,
    /// Normalised SQL handed to the executor.
    pub executed_sql: Option<String>,
    pub trace: Vec<PipelineState>,
}

impl PipelineRun {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: PipelineState::Received,
            attempts: 0,
            max_attempts,
            last_rejection: None,
            last_candidate: None,
            executed_sql: None,
            trace: vec![PipelineState::Received],
        }
    }

    pub fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, attempt = self.attempts, "Pipeline transition");
        self.state = next;
        self.trace.push(next);
    }

    pub const fn has_budget(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// SQL to report alongside a response: executed text if any, else the
    /// last generated candidate.
    pub fn reported_sql(&self) -> Option<String> {
        self.executed_sql
            .clone()
            .or_else(|| self.last_candidate.as_ref().map(|c| c.sql.clone()))
            .filter(|sql| !sql.trim().is_empty())
    }

    fn feedback(&self) -> Option<(&str, &Rejection)> {
        match (&self.last_candidate, &self.last_rejection) {
            (Some(candidate), Some(rejection)) => Some((candidate.sql.as_str(), rejection)),
            _ => None,
        }
    }

    fn fail(&mut self, error: PipelineError) -> Result<Answer, PipelineError> {
        self.transition(PipelineState::Failed(error.status()));
        Err(error)
    }
}

/// A completed run's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sql: String,
    pub result: QueryResult,
}

/// Result of [`Text2SqlPipeline::execute`].
#[derive(Debug)]
pub struct PipelineOutcome {
    pub run: PipelineRun,
    pub result: Result<Answer, PipelineError>,
}

/// Settings derived from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub generation: GenerationParameters,
    pub formatting: GenerationParameters,
    pub max_retries: u32,
    pub query_timeout: Duration,
    pub template_row_threshold: usize,
    pub check_references: bool,
    pub max_sql_length: usize,
}

impl PipelineSettings {
    pub fn from_config(agent: &Text2SqlConfig, database: &DatabaseConfig) -> Self {
        Self {
            generation: GenerationParameters {
                model: agent.model.clone(),
                temperature: agent.temperature,
                max_tokens: agent.max_tokens,
            },
            formatting: GenerationParameters {
                model: agent.model.clone(),
                temperature: agent.format_temperature,
                max_tokens: agent.max_tokens,
            },
            max_retries: agent.max_retries,
            query_timeout: Duration::from_secs(database.query_timeout_secs),
            template_row_threshold: agent.template_row_threshold,
            check_references: agent.check_references,
            max_sql_length: agent.max_sql_length,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Text2SqlConfig::default(), &DatabaseConfig::default())
    }
}

/// Drives one question through generation, validation, execution and
/// formatting.
pub struct Text2SqlPipeline {
    gateway: Arc<dyn LlmGateway>,
    executor: Arc<dyn DatabaseExecutor>,
    validator: SqlValidator,
    formatter: AnswerFormatter,
    settings: PipelineSettings,
}

impl Text2SqlPipeline {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        executor: Arc<dyn DatabaseExecutor>,
        settings: PipelineSettings,
    ) -> Self {
        let formatter = AnswerFormatter::new(
            gateway.clone(),
            settings.formatting.clone(),
            settings.template_row_threshold,
        );
        Self {
            gateway,
            executor,
            validator: SqlValidator::new(),
            formatter,
            settings,
        }
    }

    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &Arc<dyn LlmGateway> {
        &self.gateway
    }

    pub fn executor(&self) -> &Arc<dyn DatabaseExecutor> {
        &self.executor
    }

    #[instrument(skip(self, question), fields(question_id = %question.id))]
    pub async fn execute(&self, question: &Question) -> PipelineOutcome {
        let mut run = PipelineRun::new(self.settings.max_retries.saturating_add(1));
        let result = self.drive(question, &mut run).await;
        info!(
            state = ?run.state,
            attempts = run.attempts,
            "Text2SQL run finished"
        );
        PipelineOutcome { run, result }
    }

    async fn drive(&self, question: &Question, run: &mut PipelineRun) -> Result<Answer, PipelineError> {
        let schema = match self.executor.describe_schema().await {
            Ok(schema) => Arc::new(schema),
            Err(err) => {
                warn!(error = %err, "Could not describe database schema");
                return run.fail(PipelineError::Schema(err));
            }
        };
        let schema_text = schema.render(SchemaFormat::Text);
        let policy = ValidationPolicy {
            check_references: self.settings.check_references,
            max_sql_length: self.settings.max_sql_length,
            schema: Some(schema),
        };

        let sql = loop {
            let generating = if run.last_rejection.is_some() {
                PipelineState::Regenerating
            } else {
                PipelineState::Generating
            };
            run.transition(generating);
            run.attempts += 1;

            let candidate = match self.generate(question, &schema_text, run).await {
                Ok(candidate) => candidate,
                Err(reason) => {
                    warn!(attempt = run.attempts, reason = %reason, "SQL generation attempt failed");
                    if run.has_budget() {
                        continue;
                    }
                    return run.fail(PipelineError::Generation {
                        attempts: run.attempts,
                        reason,
                    });
                }
            };

            run.transition(PipelineState::Validating);
            let verdict = self.validator.validate(&candidate, &policy);
            run.last_candidate = Some(candidate);

            if let Some(normalized) = verdict.normalized_sql.filter(|_| verdict.accepted) {
                break normalized;
            }
            let Some(rejection) = verdict.rejection else {
                return run.fail(PipelineError::Generation {
                    attempts: run.attempts,
                    reason: "validator returned no verdict".to_string(),
                });
            };

            warn!(
                attempt = run.attempts,
                kind = %rejection.kind,
                recoverable = rejection.recoverable,
                "Generated SQL rejected"
            );
            if rejection.recoverable && run.has_budget() {
                run.last_rejection = Some(rejection);
                continue;
            }
            run.last_rejection = Some(rejection.clone());
            return run.fail(PipelineError::Validation(rejection));
        };

        run.transition(PipelineState::Executing);
        run.executed_sql = Some(sql.clone());
        let result = match self.executor.execute(&sql, self.settings.query_timeout).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Query execution failed");
                return run.fail(PipelineError::Execution(err));
            }
        };
        info!(rows = result.row_count, duration_ms = result.duration_ms, "Query executed");

        run.transition(PipelineState::Formatting);
        let text = self.formatter.format(question, &sql, &result).await;

        run.transition(PipelineState::Completed);
        Ok(Answer { text, sql, result })
    }

    /// One gateway call. Errors and blank output are returned as a reason.
    async fn generate(
        &self,
        question: &Question,
        schema_text: &str,
        run: &PipelineRun,
    ) -> Result<SqlCandidate, String> {
        let prompt = sql_generation_prompt(
            &question.text,
            schema_text,
            self.executor.dialect(),
            run.feedback(),
        );
        let request = GenerationRequest::new(prompt, self.settings.generation.clone())
            .with_system(SQL_SYSTEM_PROMPT)
            .with_history(question.history.clone());

        let output = self.gateway.generate(request).await.map_err(|e| e.to_string())?;
        let candidate = SqlCandidate::from_model_output(&output, run.attempts, self.gateway.gateway_id())
            .with_model(Some(self.settings.generation.model.clone()));
        if candidate.is_blank() {
            return Err("model returned no SQL".to_string());
        }
        debug!(attempt = run.attempts, sql = %candidate.sql, "Generated SQL candidate");
        Ok(candidate)
    }
}
