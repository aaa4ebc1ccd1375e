//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use console::style;
use serde::Serialize;

use crate::domain::models::ResponseStatus;

/// Trait for types that can be rendered as human-readable or JSON output.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Dispatch output based on JSON mode flag.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Status label coloured by outcome.
pub fn styled_status(status: ResponseStatus) -> String {
    let label = status.as_str();
    match status {
        ResponseStatus::Success => style(label).green().bold().to_string(),
        ResponseStatus::Unrouted => style(label).yellow().to_string(),
        ResponseStatus::ExecutionTimeout => style(label).magenta().to_string(),
        ResponseStatus::GenerationFailed
        | ResponseStatus::ValidationFailed
        | ResponseStatus::ExecutionFailed => style(label).red().bold().to_string(),
    }
}

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    format!("{} {}", style("\u{2713}").green().bold(), message)
}

/// Render a failure action result.
pub fn action_failure(message: &str) -> String {
    format!("{} {}", style("\u{2717}").red().bold(), message)
}

/// Styled label for detail views.
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}
