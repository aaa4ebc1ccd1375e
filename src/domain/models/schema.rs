//! Database schema descriptions and their LLM-friendly renderings.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A foreign-key edge from `column` to `references_table.references_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Case-insensitive column lookup.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Read-only description of the target database, supplied by the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Database dialect, e.g. `sqlite`.
    pub dialect: String,
    pub tables: Vec<TableSchema>,
}

impl SchemaDescription {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn render(&self, format: SchemaFormat) -> String {
        match format {
            SchemaFormat::Text => self.render_text(),
            SchemaFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            SchemaFormat::Markdown => self.render_markdown(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = format!("Database Schema ({}):\n\n", self.dialect.to_uppercase());
        for table in &self.tables {
            let _ = writeln!(out, "Table: {}", table.name);
            let _ = writeln!(out, "{}", "-".repeat(table.name.len() + 7));
            for col in &table.columns {
                let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
                let default = col
                    .default
                    .as_ref()
                    .map(|d| format!(" DEFAULT {d}"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {:<20} {:<15} {nullable}{default}",
                    col.name, col.data_type
                );
            }
            if !table.foreign_keys.is_empty() {
                out.push_str("\n  Foreign Keys:\n");
                for fk in &table.foreign_keys {
                    let _ = writeln!(
                        out,
                        "    {} -> {}.{}",
                        fk.column, fk.references_table, fk.references_column
                    );
                }
            }
            out.push('\n');
        }
        out
    }

    fn render_markdown(&self) -> String {
        let mut out = format!("# Database Schema ({})\n\n", self.dialect.to_uppercase());
        for table in &self.tables {
            let _ = writeln!(out, "## Table: `{}`\n", table.name);
            out.push_str("| Column | Type | Nullable | Default |\n");
            out.push_str("|--------|------|----------|---------|\n");
            for col in &table.columns {
                let _ = writeln!(
                    out,
                    "| `{}` | `{}` | {} | {} |",
                    col.name,
                    col.data_type,
                    if col.nullable { "YES" } else { "NO" },
                    col.default.as_deref().unwrap_or("")
                );
            }
            if !table.foreign_keys.is_empty() {
                out.push_str("\n**Foreign Keys:**\n\n");
                for fk in &table.foreign_keys {
                    let _ = writeln!(
                        out,
                        "- `{}` → `{}.{}`",
                        fk.column, fk.references_table, fk.references_column
                    );
                }
            }
            out.push_str("\n---\n\n");
        }
        out
    }
}

/// Output format for [`SchemaDescription::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl FromStr for SchemaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "Unsupported schema format: {other}. Must be one of: text, json, markdown"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaDescription {
        SchemaDescription::new("sqlite")
            .with_table(
                TableSchema::new("users")
                    .with_column(ColumnSchema::new("id", "INTEGER").not_null())
                    .with_column(ColumnSchema::new("name", "TEXT")),
            )
            .with_table(
                TableSchema::new("orders")
                    .with_column(ColumnSchema::new("id", "INTEGER").not_null())
                    .with_column(ColumnSchema::new("user_id", "INTEGER"))
                    .with_foreign_key(ForeignKey {
                        column: "user_id".into(),
                        references_table: "users".into(),
                        references_column: "id".into(),
                    }),
            )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let schema = sample_schema();
        let users = schema.table("USERS").expect("users table");
        assert!(users.has_column("Name"));
        assert!(!users.has_column("email"));
        assert!(schema.table("products").is_none());
    }

    #[test]
    fn test_render_text() {
        let text = sample_schema().render(SchemaFormat::Text);
        assert!(text.starts_with("Database Schema (SQLITE):"));
        assert!(text.contains("Table: users"));
        assert!(text.contains("NOT NULL"));
        assert!(text.contains("user_id -> users.id"));
    }

    #[test]
    fn test_render_markdown_and_json() {
        let schema = sample_schema();
        let md = schema.render(SchemaFormat::Markdown);
        assert!(md.contains("## Table: `orders`"));
        assert!(md.contains("| `id` | `INTEGER` | NO |  |"));

        let json: SchemaDescription =
            serde_json::from_str(&schema.render(SchemaFormat::Json)).expect("valid json");
        assert_eq!(json, schema);
    }

    #[test]
    fn test_schema_format_parse() {
        assert_eq!("MD".parse::<SchemaFormat>(), Ok(SchemaFormat::Markdown));
        assert!("xml".parse::<SchemaFormat>().is_err());
    }
}
