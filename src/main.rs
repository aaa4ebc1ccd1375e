//! sqlpilot CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use sqlpilot::cli::commands::{self, load_config};
use sqlpilot::cli::{handle_error, Cli, Commands};
use sqlpilot::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command, cli.config.as_deref(), cli.json).await {
        Ok(code) => code,
        Err(err) => {
            handle_error(&err, cli.json);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config_path: Option<&std::path::Path>,
    json_mode: bool,
) -> anyhow::Result<ExitCode> {
    if let Commands::Init(args) = command {
        return commands::init::execute(args, json_mode);
    }

    let config = load_config(config_path)?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match command {
        Commands::Ask(args) => commands::ask::execute(args, &config, json_mode).await,
        Commands::Agents => commands::agents::execute(&config, json_mode).await,
        Commands::Health => commands::health::execute(&config, json_mode).await,
        Commands::Schema(args) => commands::schema::execute(args, &config, json_mode).await,
        Commands::Init(args) => commands::init::execute(args, json_mode),
    }
}
