//! Implementation of the `sqlpilot init` command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{action_success, output, CommandOutput};
use crate::infrastructure::setup::{self, InitOutcome, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!("{}\n  {}", action_success(&self.message), self.config_file.display())
        } else {
            self.message.clone()
        }
    }
}

pub fn execute(args: InitArgs, json_mode: bool) -> Result<ExitCode> {
    let paths = SetupPaths::in_dir(&args.path);
    let outcome = setup::init(&paths, args.force)
        .with_context(|| format!("Failed to write {}", paths.config_file.display()))?;

    let (success, message) = match outcome {
        InitOutcome::Created => (true, "Created sqlpilot configuration"),
        InitOutcome::Overwritten => (true, "Reinitialized sqlpilot configuration"),
        InitOutcome::AlreadyInitialized => (
            false,
            "Project already initialized. Use --force to reinitialize.",
        ),
    };
    output(
        &InitOutput {
            success,
            message: message.to_string(),
            config_file: paths.config_file,
        },
        json_mode,
    );
    Ok(ExitCode::SUCCESS)
}
