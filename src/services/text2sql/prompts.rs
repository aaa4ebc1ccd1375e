//! Prompt construction for SQL generation and answer formatting.

use std::fmt::Write as _;

use crate::domain::models::{display_value, QueryResult, Rejection};

pub const SQL_SYSTEM_PROMPT: &str = "You are a SQL expert that converts natural language \
questions into SQL queries.\n\
Your response must be a single read-only SQL query with no additional text or explanation.\n\
Only SELECT (or WITH ... SELECT) queries are allowed.\n\
The query must be complete and ready to execute.";

pub const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant that explains database \
query results in natural language.\n\
Your response should be clear, concise, and directly answer the user's question.\n\
Do not mention SQL queries or technical details.";

/// Rows included in the answer-formatting prompt.
const MAX_PROMPT_ROWS: usize = 50;

/// Build the SQL generation prompt. `feedback` carries the previous
/// candidate and its rejection when regenerating.
pub fn sql_generation_prompt(
    question: &str,
    schema_text: &str,
    dialect: &str,
    feedback: Option<(&str, &Rejection)>,
) -> String {
    let mut prompt = format!(
        "Given the following {dialect} database schema:\n{schema_text}\n\
         Convert the following natural language question into a SQL query.\n\n\
         Question: {question}\n"
    );

    if let Some((previous_sql, rejection)) = feedback {
        let _ = write!(
            prompt,
            "\nYour previous query was rejected.\nPrevious query: {previous_sql}\n\
             Reason: {}\nWrite a corrected query that avoids this problem.\n",
            rejection.message
        );
    }

    prompt.push_str("\nRespond with the SQL query only.");
    prompt
}

/// Build the answer formatting prompt.
pub fn answer_format_prompt(question: &str, sql: &str, result: &QueryResult) -> String {
    let mut rows = String::new();
    for row in result.rows.iter().take(MAX_PROMPT_ROWS) {
        let cells: Vec<String> = result
            .ordered_values(row)
            .map(|(column, value)| format!("{column}={}", display_value(value)))
            .collect();
        let _ = writeln!(rows, "- {}", cells.join(", "));
    }
    if result.row_count > MAX_PROMPT_ROWS {
        let _ = writeln!(rows, "- ... {} more rows", result.row_count - MAX_PROMPT_ROWS);
    }

    format!(
        "Original question: {question}\nSQL query: {sql}\n\
         Query results ({} rows):\n{rows}\n\
         Please provide a natural language answer that directly addresses the original question.",
        result.row_count
    )
}
