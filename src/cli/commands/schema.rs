//! `sqlpilot schema`

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::models::{Config, SchemaFormat};
use crate::infrastructure::setup;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Output format: text, json, markdown
    #[arg(short, long, default_value = "text")]
    pub format: SchemaFormat,
}

pub async fn execute(args: SchemaArgs, config: &Config, json_mode: bool) -> Result<ExitCode> {
    let executor = setup::build_executor(config)
        .await
        .context("Failed to open database")?;
    let schema = executor
        .describe_schema()
        .await
        .context("Failed to read database schema")?;

    let format = if json_mode { SchemaFormat::Json } else { args.format };
    println!("{}", schema.render(format));
    Ok(ExitCode::SUCCESS)
}
