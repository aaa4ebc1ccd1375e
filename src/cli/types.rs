//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::{ask::AskArgs, init::InitArgs, schema::SchemaArgs};

#[derive(Parser, Debug)]
#[command(name = "sqlpilot")]
#[command(about = "sqlpilot - answer questions about your database in plain language", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .sqlpilot/config.yaml)
    #[arg(short, long, global = true, env = "SQLPILOT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about the database
    Ask(AskArgs),

    /// List registered agents
    Agents,

    /// Check gateway and database reachability for every agent
    Health,

    /// Print the database schema
    Schema(SchemaArgs),

    /// Create a default .sqlpilot/config.yaml
    Init(InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SchemaFormat;

    #[test]
    fn test_parse_ask_with_session() {
        let cli = Cli::parse_from(["sqlpilot", "--json", "ask", "how", "many", "users?", "--session", "s1"]);
        assert!(cli.json);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.question.join(" "), "how many users?");
                assert_eq!(args.session.as_deref(), Some("s1"));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_schema_format() {
        let cli = Cli::parse_from(["sqlpilot", "schema", "--format", "markdown"]);
        match cli.command {
            Commands::Schema(args) => assert_eq!(args.format, SchemaFormat::Markdown),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["sqlpilot", "ask"]).is_err());
    }
}
