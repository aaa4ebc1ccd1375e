//! Generated SQL candidates and validation verdicts.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::schema::SchemaDescription;

/// SQL text produced by one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlCandidate {
    pub sql: String,
    /// 1-based attempt number within the request.
    pub attempt: u32,
    /// Gateway that produced the text.
    pub gateway: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SqlCandidate {
    pub fn new(sql: impl Into<String>, attempt: u32, gateway: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            attempt,
            gateway: gateway.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Build a candidate from raw model output, removing markdown code fences
    /// the model may have wrapped the statement in.
    pub fn from_model_output(
        output: &str,
        attempt: u32,
        gateway: impl Into<String>,
    ) -> Self {
        Self::new(strip_code_fences(output), attempt, gateway)
    }

    pub fn is_blank(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

/// Remove a surrounding ```` ```sql ... ``` ```` block, if present.
pub fn strip_code_fences(output: &str) -> String {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop an info string such as `sql` on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionKind {
    Empty,
    UnsafeStatement,
    MultipleStatements,
    DisallowedStatement,
    Syntax,
    UnknownReference,
    TooLong,
}

impl RejectionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::UnsafeStatement => "unsafe-statement",
            Self::MultipleStatements => "multiple-statements",
            Self::DisallowedStatement => "disallowed-statement",
            Self::Syntax => "syntax",
            Self::UnknownReference => "unknown-reference",
            Self::TooLong => "too-long",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validator rejection. Recoverable rejections may be fed back to the model
/// for another attempt; unrecoverable ones end the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub recoverable: bool,
    pub message: String,
}

impl Rejection {
    pub fn recoverable(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            recoverable: true,
            message: message.into(),
        }
    }

    pub fn unrecoverable(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            recoverable: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Outcome of validating a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// The exact text to execute; present only when accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_sql: Option<String>,
}

impl ValidationVerdict {
    pub fn accept(normalized_sql: impl Into<String>) -> Self {
        Self {
            accepted: true,
            rejection: None,
            normalized_sql: Some(normalized_sql.into()),
        }
    }

    pub const fn reject(rejection: Rejection) -> Self {
        Self {
            accepted: false,
            rejection: Some(rejection),
            normalized_sql: None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.rejection.as_ref().is_some_and(|r| r.recoverable)
    }
}

/// Knobs for a validation pass.
///
/// The statement-type and multi-statement checks are not configurable.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Check referenced tables and qualified columns against `schema`.
    pub check_references: bool,
    pub max_sql_length: usize,
    pub schema: Option<Arc<SchemaDescription>>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            check_references: true,
            max_sql_length: 10_000,
            schema: None,
        }
    }
}

impl ValidationPolicy {
    pub fn with_schema(mut self, schema: Arc<SchemaDescription>) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```sql\nSELECT 1;\n```"),
            "SELECT 1;"
        );
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("  SELECT 1;  "), "SELECT 1;");
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_candidate_from_model_output() {
        let candidate = SqlCandidate::from_model_output("```sql\n\n```", 2, "mock");
        assert!(candidate.is_blank());
        assert_eq!(candidate.attempt, 2);
    }

    #[test]
    fn test_verdict_constructors() {
        let ok = ValidationVerdict::accept("SELECT 1;");
        assert!(ok.accepted);
        assert!(!ok.is_recoverable());

        let rejected = ValidationVerdict::reject(Rejection::recoverable(
            RejectionKind::Syntax,
            "unbalanced parentheses",
        ));
        assert!(!rejected.accepted);
        assert!(rejected.is_recoverable());
        assert!(rejected.normalized_sql.is_none());
    }
}
