//! `sqlpilot health`

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{action_failure, action_success, output, progress::create_spinner, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::setup;
use crate::services::HealthReport;

impl CommandOutput for HealthReport {
    fn to_human(&self) -> String {
        let headline = if self.healthy {
            action_success("All agents healthy")
        } else {
            action_failure("One or more agents are unhealthy")
        };
        format!("{headline}\n{}", TableFormatter::new().format_health(self))
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<ExitCode> {
    let orchestrator = setup::build_orchestrator(config)
        .await
        .context("Failed to initialise sqlpilot")?;

    let spinner = create_spinner("Checking agents...", json_mode);
    let report = orchestrator.health_report().await;
    spinner.finish_and_clear();

    output(&report, json_mode);
    Ok(if report.healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
