//! `sqlpilot agents`

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{AgentInfo, Config};
use crate::infrastructure::setup;
use crate::services::OrchestratorStats;

#[derive(Debug, Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentInfo>,
    pub stats: OrchestratorStats,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }
        format!(
            "{} agent(s), {} routing rule(s), {:?} matching\n{}",
            self.stats.agents,
            self.stats.routing_rules,
            self.stats.match_mode,
            TableFormatter::new().format_agents(&self.agents)
        )
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<ExitCode> {
    let orchestrator = setup::build_orchestrator(config)
        .await
        .context("Failed to initialise sqlpilot")?;

    let listing = AgentListOutput {
        agents: orchestrator.list_agents(),
        stats: orchestrator.stats(),
    };
    output(&listing, json_mode);
    Ok(ExitCode::SUCCESS)
}
