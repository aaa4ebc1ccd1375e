//! `sqlpilot ask`

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{label, output, progress::create_spinner, styled_status, CommandOutput};
use crate::domain::models::{AgentResponse, Config, Question, SessionContext};
use crate::infrastructure::setup;
use crate::services::RouteDecision;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question in natural language
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Session identifier attached to logs and the question
    #[arg(short, long)]
    pub session: Option<String>,

    /// Show the routing decision without invoking any agent
    #[arg(long)]
    pub dry_run: bool,
}

impl CommandOutput for AgentResponse {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} {}", label("Status"), styled_status(self.status))];
        if let Some(agent) = &self.agent {
            lines.push(format!("{} {agent} ({} attempt(s))", label("Agent"), self.attempts));
        }
        lines.push(String::new());
        lines.push(self.answer.clone());

        if let Some(sql) = &self.sql {
            lines.push(String::new());
            lines.push(format!("{} {}", label("SQL"), console::style(sql).dim()));
        }
        if let Some(result) = &self.result {
            if !result.is_empty() {
                lines.push(String::new());
                lines.push(TableFormatter::new().format_result(result));
            }
        }
        lines.join("\n")
    }
}

/// Routing decision printed by `--dry-run`.
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub category: String,
    pub matched_keyword: Option<String>,
    pub agent: Option<String>,
}

impl From<RouteDecision> for RouteOutput {
    fn from(decision: RouteDecision) -> Self {
        Self {
            category: decision.category().to_string(),
            matched_keyword: decision
                .classification
                .matched_rule
                .map(|rule| rule.keyword),
            agent: decision.agent,
        }
    }
}

impl CommandOutput for RouteOutput {
    fn to_human(&self) -> String {
        format!(
            "{} {}\n{} {}\n{} {}",
            label("Category"),
            self.category,
            label("Rule"),
            self.matched_keyword.as_deref().unwrap_or("-"),
            label("Agent"),
            self.agent.as_deref().unwrap_or("none (unrouted)"),
        )
    }
}

pub async fn execute(args: AskArgs, config: &Config, json_mode: bool) -> Result<ExitCode> {
    let text = args.question.join(" ");
    if text.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let orchestrator = setup::build_orchestrator(config)
        .await
        .context("Failed to initialise sqlpilot")?;
    let session = args.session.map(SessionContext::new).unwrap_or_default();

    if args.dry_run {
        let question = Question::with_context(text, session);
        output(&RouteOutput::from(orchestrator.route(&question)), json_mode);
        return Ok(ExitCode::SUCCESS);
    }

    let spinner = create_spinner("Thinking...", json_mode);
    let response = orchestrator.process_question(&text, session).await;
    spinner.finish_and_clear();

    output(&response, json_mode);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
