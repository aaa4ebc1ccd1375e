//! Turns query results into natural-language answers.

use std::sync::Arc;

use tracing::{debug, warn};

use super::prompts::{answer_format_prompt, ANSWER_SYSTEM_PROMPT};
use crate::domain::errors::FormattingError;
use crate::domain::models::{display_value, QueryResult, Question};
use crate::domain::ports::{GenerationParameters, GenerationRequest, LlmGateway};

/// Chooses between deterministic templates and a model call.
///
/// Empty results and results with at most `template_row_threshold` rows are
/// answered from templates; larger results go to the gateway. A failed
/// gateway call falls back to [`AnswerFormatter::summary`].
pub struct AnswerFormatter {
    gateway: Arc<dyn LlmGateway>,
    parameters: GenerationParameters,
    template_row_threshold: usize,
}

impl AnswerFormatter {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        parameters: GenerationParameters,
        template_row_threshold: usize,
    ) -> Self {
        Self {
            gateway,
            parameters,
            template_row_threshold,
        }
    }

    /// Produce an answer; never fails.
    pub async fn format(&self, question: &Question, sql: &str, result: &QueryResult) -> String {
        match self.try_format(question, sql, result).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "Answer formatting failed, using summary");
                Self::summary(result)
            }
        }
    }

    pub async fn try_format(
        &self,
        question: &Question,
        sql: &str,
        result: &QueryResult,
    ) -> Result<String, FormattingError> {
        if result.is_empty() {
            return Ok(Self::no_rows());
        }
        if result.row_count <= self.template_row_threshold {
            debug!(rows = result.row_count, "Formatting answer from template");
            return Ok(Self::template(result));
        }

        let request = GenerationRequest::new(
            answer_format_prompt(&question.text, sql, result),
            self.parameters.clone(),
        )
        .with_system(ANSWER_SYSTEM_PROMPT);

        let answer = self.gateway.generate(request).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(FormattingError::Empty);
        }
        Ok(answer.to_string())
    }

    pub fn no_rows() -> String {
        "No matching rows were found for your question.".to_string()
    }

    /// Deterministic answer listing every value of a small result.
    pub fn template(result: &QueryResult) -> String {
        if let (Some(value), [column]) = (result.scalar(), result.columns.as_slice()) {
            return format!("The answer is {} ({column}).", display_value(value));
        }

        let rows: Vec<String> = result
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = result
                    .ordered_values(row)
                    .map(|(column, value)| format!("{column}: {}", display_value(value)))
                    .collect();
                format!("- {}", cells.join(", "))
            })
            .collect();
        format!("Found {} {}:\n{}", result.row_count, plural(result.row_count), rows.join("\n"))
    }

    /// Generic summary used when formatting fails.
    pub fn summary(result: &QueryResult) -> String {
        let mut summary = format!("The query returned {} {}", result.row_count, plural(result.row_count));
        if !result.columns.is_empty() {
            summary.push_str(&format!(" with columns {}", result.columns.join(", ")));
        }
        if result.truncated {
            summary.push_str(" (truncated)");
        }
        summary.push('.');
        summary
    }
}

const fn plural(count: usize) -> &'static str {
    if count == 1 {
        "row"
    } else {
        "rows"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::gateways::MockGateway;
    use crate::domain::errors::GatewayError;
    use crate::domain::models::Row;

    fn result(rows: &[(&str, i64)]) -> QueryResult {
        let rows = rows
            .iter()
            .map(|(name, n)| {
                let mut row = Row::new();
                row.insert("name".into(), json!(name));
                row.insert("total".into(), json!(n));
                row
            })
            .collect();
        QueryResult::new(vec!["name".into(), "total".into()], rows)
    }

    fn formatter(gateway: Arc<MockGateway>, threshold: usize) -> AnswerFormatter {
        AnswerFormatter::new(gateway, GenerationParameters::default(), threshold)
    }

    #[tokio::test]
    async fn test_scalar_template() {
        let gateway = Arc::new(MockGateway::new());
        let mut row = Row::new();
        row.insert("count".into(), json!(42));
        let result = QueryResult::new(vec!["count".into()], vec![row]);

        let answer = formatter(gateway.clone(), 1)
            .format(&Question::new("How many users?"), "SELECT COUNT(*) FROM users;", &result)
            .await;
        assert_eq!(answer, "The answer is 42 (count).");
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_skips_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let answer = formatter(gateway.clone(), 0)
            .format(&Question::new("q"), "SELECT 1;", &result(&[]))
            .await;
        assert_eq!(answer, AnswerFormatter::no_rows());
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_large_result_uses_gateway() {
        let gateway = Arc::new(MockGateway::new().with_reply("Ada and Bob placed orders."));
        let answer = formatter(gateway.clone(), 1)
            .format(&Question::new("q"), "SELECT 1;", &result(&[("Ada", 2), ("Bob", 3)]))
            .await;
        assert_eq!(answer, "Ada and Bob placed orders.");
        let request = gateway.requests().pop().unwrap();
        assert!(request.prompt.contains("name=Ada, total=2"));
        assert_eq!(request.system.as_deref(), Some(ANSWER_SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_summary() {
        let gateway = Arc::new(MockGateway::new().with_error(GatewayError::Timeout(60)));
        let data = result(&[("Ada", 2), ("Bob", 3)]);
        let answer = formatter(gateway, 1).format(&Question::new("q"), "SELECT 1;", &data).await;
        assert_eq!(answer, "The query returned 2 rows with columns name, total.");
    }

    #[test]
    fn test_multi_row_template() {
        let answer = AnswerFormatter::template(&result(&[("Ada", 2), ("Bob", 3)]));
        assert_eq!(answer, "Found 2 rows:\n- name: Ada, total: 2\n- name: Bob, total: 3");
    }
}
