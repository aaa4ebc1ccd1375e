//! Table output formatting for CLI commands
//!
//! Query results, agents and health checks rendered with comfy-table.

use std::env;
use std::fmt::Write as _;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{display_value, AgentInfo, QueryResult};
use crate::services::HealthReport;

const MAX_CELL_WIDTH: usize = 60;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum rows printed for a query result
    max_rows: usize,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_rows: 50,
        }
    }

    pub const fn with_config(use_colors: bool, max_rows: usize) -> Self {
        Self { use_colors, max_rows }
    }

    /// Format a query result; rows beyond `max_rows` are summarised.
    pub fn format_result(&self, result: &QueryResult) -> String {
        if result.columns.is_empty() {
            return "(no rows)".to_string();
        }

        let mut table = Self::create_base_table();
        table.set_header(
            result
                .columns
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );

        for row in result.rows.iter().take(self.max_rows) {
            table.add_row(result.columns.iter().map(|column| {
                let text = row.get(column).map(display_value).unwrap_or_default();
                let cell = Cell::new(truncate_text(&text, MAX_CELL_WIDTH));
                if self.use_colors && text == "NULL" {
                    cell.fg(Color::DarkGrey)
                } else {
                    cell
                }
            }));
        }

        let mut rendered = table.to_string();
        let hidden = result.rows.len().saturating_sub(self.max_rows);
        if hidden > 0 {
            let _ = write!(rendered, "\n... {hidden} more row(s)");
        }
        if result.truncated {
            rendered.push_str("\n(result truncated by the row limit)");
        }
        rendered
    }

    /// Format registered agents in priority order
    pub fn format_agents(&self, agents: &[AgentInfo]) -> String {
        let mut table = Self::create_base_table();
        table.set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Categories").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

        for agent in agents {
            let categories = agent
                .categories
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let name = if self.use_colors {
                Cell::new(&agent.name).fg(Color::Cyan)
            } else {
                Cell::new(&agent.name)
            };
            table.add_row(vec![
                name,
                Cell::new(agent.priority),
                Cell::new(categories),
                Cell::new(truncate_text(&agent.description, MAX_CELL_WIDTH)),
            ]);
        }
        table.to_string()
    }

    /// Format per-agent health
    pub fn format_health(&self, report: &HealthReport) -> String {
        let mut table = Self::create_base_table();
        table.set_header(vec![
            Cell::new("Agent").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for agent in &report.agents {
            let (text, color) = if agent.healthy {
                ("✓ healthy", Color::Green)
            } else {
                ("✗ unhealthy", Color::Red)
            };
            let cell = if self.use_colors {
                Cell::new(text).fg(color)
            } else {
                Cell::new(text)
            };
            table.add_row(vec![Cell::new(&agent.name), cell]);
        }
        table.to_string()
    }

    fn create_base_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::colors_enabled()
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
