//! Rows returned by the database executor.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Result of executing a validated statement.
///
/// Owned by the request that produced it; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select-list order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub duration_ms: u64,
    /// Set when the executor stopped reading at its row cap.
    #[serde(default)]
    pub truncated: bool,
    pub executed_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            row_count: rows.len(),
            rows,
            duration_ms: 0,
            truncated: false,
            executed_at: Utc::now(),
        }
    }

    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub const fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The single value of a one-row, one-column result.
    pub fn scalar(&self) -> Option<&Value> {
        match (self.rows.as_slice(), self.columns.as_slice()) {
            ([row], [column]) => row.get(column),
            _ => None,
        }
    }

    /// Values of `row` in column order.
    pub fn ordered_values<'a>(&'a self, row: &'a Row) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .filter_map(move |c| row.get(c).map(|v| (c.as_str(), v)))
    }
}

/// Make column labels usable as row keys: a repeated label gets the first
/// free `_2`, `_3`, ... suffix.
pub fn unique_column_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for label in labels {
        let label = label.into();
        let mut candidate = label.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{label}_{suffix}");
            suffix += 1;
        }
        unique.push(candidate);
    }
    unique
}

/// Render a JSON cell value the way a person would read it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_scalar() {
        let result = QueryResult::new(vec!["count".into()], vec![row(&[("count", json!(42))])]);
        assert_eq!(result.scalar(), Some(&json!(42)));
        assert_eq!(result.row_count, 1);

        let wide = QueryResult::new(
            vec!["a".into(), "b".into()],
            vec![row(&[("a", json!(1)), ("b", json!(2))])],
        );
        assert!(wide.scalar().is_none());
    }

    #[test]
    fn test_ordered_values_follow_columns() {
        let result = QueryResult::new(
            vec!["name".into(), "age".into()],
            vec![row(&[("age", json!(30)), ("name", json!("Ada"))])],
        );
        let values: Vec<_> = result.ordered_values(&result.rows[0]).collect();
        assert_eq!(values[0].0, "name");
        assert_eq!(values[1].0, "age");
    }

    #[test]
    fn test_unique_column_labels() {
        assert_eq!(unique_column_labels(["id", "name"]), vec!["id", "name"]);
        assert_eq!(unique_column_labels(["id", "id", "id"]), vec!["id", "id_2", "id_3"]);
        // An existing `id_2` pushes the duplicate to the next free suffix.
        assert_eq!(
            unique_column_labels(["id", "id_2", "id"]),
            vec!["id", "id_2", "id_3"]
        );
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("Ada")), "Ada");
        assert_eq!(display_value(&json!(null)), "NULL");
        assert_eq!(display_value(&json!(3.5)), "3.5");
    }
}
