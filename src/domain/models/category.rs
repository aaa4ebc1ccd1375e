//! Task categories and keyword routing rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label produced by classifying a question.
///
/// `Agent(name)` addresses a single agent directly: every registered agent
/// implicitly accepts the category carrying its own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskCategory {
    Sql,
    Query,
    Database,
    Unknown,
    Agent(String),
}

impl TaskCategory {
    /// Interpret a routing target: known category tokens map to their
    /// category, anything else is taken as an agent name.
    pub fn from_target(target: &str) -> Self {
        let trimmed = target.trim();
        match trimmed.to_lowercase().as_str() {
            "sql" => Self::Sql,
            "query" => Self::Query,
            "database" => Self::Database,
            "unknown" => Self::Unknown,
            _ => {
                let name = trimmed.strip_prefix("agent:").unwrap_or(trimmed);
                Self::Agent(name.trim().to_string())
            }
        }
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql => f.write_str("sql"),
            Self::Query => f.write_str("query"),
            Self::Database => f.write_str("database"),
            Self::Unknown => f.write_str("unknown"),
            Self::Agent(name) => write!(f, "agent:{name}"),
        }
    }
}

impl FromStr for TaskCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_target(s))
    }
}

impl Serialize for TaskCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_target(&raw))
    }
}

/// How a rule keyword is matched against question text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword may appear anywhere, including inside longer words.
    #[default]
    Substring,
    /// Keyword must be delimited by non-word characters or text boundaries.
    WholeWord,
}

/// Maps a keyword to a task category with an explicit priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Lower-cased, trimmed keyword.
    pub keyword: String,
    pub category: TaskCategory,
    /// Higher priorities are evaluated first.
    #[serde(default)]
    pub priority: i32,
}

impl RoutingRule {
    pub fn new(keyword: impl AsRef<str>, category: TaskCategory, priority: i32) -> Self {
        Self {
            keyword: keyword.as_ref().trim().to_lowercase(),
            category,
            priority,
        }
    }

    /// Check the rule against already lower-cased question text.
    pub fn matches(&self, normalized_text: &str, mode: MatchMode) -> bool {
        if self.keyword.is_empty() {
            return false;
        }
        match mode {
            MatchMode::Substring => normalized_text.contains(&self.keyword),
            MatchMode::WholeWord => normalized_text
                .match_indices(&self.keyword)
                .any(|(start, matched)| {
                    let before = normalized_text[..start].chars().next_back();
                    let after = normalized_text[start + matched.len()..].chars().next();
                    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
                }),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
