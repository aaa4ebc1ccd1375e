//! Structural and safety validation of generated SQL.
//!
//! Checks run on a masked copy of the statement in which string literals,
//! quoted identifiers and comments are blanked out with spaces, so keyword
//! detection never fires on quoted text. The masked copy keeps byte offsets
//! of the original, which lets normalisation slice the original text.
//!
//! Check order: empty, unsafe verbs, length, statement count, leading verb,
//! structure, references. Only `SELECT` and `WITH` may lead a statement;
//! other read-only verbs are recoverable and every other verb is unsafe.
//! Unsafe verbs are always unrecoverable and are not affected by
//! [`ValidationPolicy`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::models::{
    Rejection, RejectionKind, SchemaDescription, SqlCandidate, ValidationPolicy,
    ValidationVerdict,
};

/// Data- or schema-modifying verbs, plus `INTO` for `SELECT ... INTO`.
const FORBIDDEN_VERBS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "REPLACE", "DROP", "CREATE", "ALTER",
    "TRUNCATE", "RENAME", "GRANT", "REVOKE", "ATTACH", "DETACH", "VACUUM", "REINDEX", "PRAGMA",
    "COPY", "CALL", "EXEC", "EXECUTE", "LOCK", "SET", "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT",
    "RELEASE", "ANALYZE", "INTO",
];

/// Forbidden words that are also scalar functions when followed by `(`.
const FUNCTION_NAMES: &[&str] = &["REPLACE"];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_$]*").expect("valid identifier regex"));

static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][A-Za-z0-9_$]*(?:\.[A-Za-z_][A-Za-z0-9_$]*)?)(\s*\()?",
    )
    .expect("valid table reference regex")
});

static COLUMN_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_$]*)\.([A-Za-z_][A-Za-z0-9_$]*)")
        .expect("valid column reference regex")
});

static CTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bWITH(?:\s+RECURSIVE)?\s+|,\s*)([A-Za-z_][A-Za-z0-9_$]*)\s*(?:\([^()]*\))?\s+AS\s*\(")
        .expect("valid CTE regex")
});

/// Stateless SQL validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlValidator;

impl SqlValidator {
    pub const fn new() -> Self {
        Self
    }

    pub fn validate(&self, candidate: &SqlCandidate, policy: &ValidationPolicy) -> ValidationVerdict {
        validate_sql(&candidate.sql, policy)
    }
}

/// Validate raw SQL text against `policy`.
pub fn validate_sql(sql: &str, policy: &ValidationPolicy) -> ValidationVerdict {
    match check(sql, policy) {
        Ok(normalized) => ValidationVerdict::accept(normalized),
        Err(rejection) => ValidationVerdict::reject(rejection),
    }
}

fn check(sql: &str, policy: &ValidationPolicy) -> Result<String, Rejection> {
    let masked = mask(sql);
    let text = masked.text.as_str();

    let Some((start, end)) = significant_span(text) else {
        return Err(Rejection::recoverable(
            RejectionKind::Empty,
            "the generated query is empty",
        ));
    };

    check_forbidden_verbs(text)?;
    check_unknown_verbs(text)?;

    let length = sql.trim().chars().count();
    if length > policy.max_sql_length {
        return Err(Rejection::recoverable(
            RejectionKind::TooLong,
            format!(
                "the query is {length} characters long; the limit is {}",
                policy.max_sql_length
            ),
        ));
    }

    let statements = text.split(';').filter(|s| !s.trim().is_empty()).count();
    if statements > 1 {
        return Err(Rejection::recoverable(
            RejectionKind::MultipleStatements,
            format!("expected a single statement but found {statements}"),
        ));
    }

    check_leading_verb(&text[start..end])?;
    check_structure(text, masked.unterminated)?;

    if policy.check_references {
        if let Some(schema) = &policy.schema {
            check_references(text, schema)?;
        }
    }

    let body = sql.get(start..end).unwrap_or_else(|| sql.trim());
    Ok(format!("{body};"))
}

fn check_forbidden_verbs(masked: &str) -> Result<(), Rejection> {
    for token in IDENTIFIER.find_iter(masked) {
        let word = token.as_str().to_ascii_uppercase();
        if !FORBIDDEN_VERBS.contains(&word.as_str()) {
            continue;
        }
        if FUNCTION_NAMES.contains(&word.as_str())
            && masked[token.end()..].trim_start().starts_with('(')
        {
            continue;
        }
        let message = if word == "INTO" {
            "SELECT ... INTO and other writes are not allowed; only read queries may run".to_string()
        } else {
            format!("{word} statements are not allowed; only read queries may run")
        };
        return Err(Rejection::unrecoverable(RejectionKind::UnsafeStatement, message));
    }
    Ok(())
}

/// Verbs that only read, but are not plain queries.
const READ_ONLY_VERBS: &[&str] = &["EXPLAIN", "SHOW", "DESCRIBE", "DESC", "VALUES", "TABLE"];

/// First word of a statement, looking through any opening parentheses.
fn leading_verb(statement: &str) -> String {
    let body = statement.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    IDENTIFIER
        .find(body)
        .filter(|m| m.start() == 0)
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default()
}

/// Anything that neither queries nor only reads is unsafe, including
/// verbs this validator has never heard of.
fn check_unknown_verbs(masked: &str) -> Result<(), Rejection> {
    for statement in masked.split(';') {
        let verb = leading_verb(statement);
        if verb.is_empty()
            || matches!(verb.as_str(), "SELECT" | "WITH")
            || READ_ONLY_VERBS.contains(&verb.as_str())
        {
            continue;
        }
        return Err(Rejection::unrecoverable(
            RejectionKind::UnsafeStatement,
            format!("{verb} statements are not allowed; only read queries may run"),
        ));
    }
    Ok(())
}

fn check_leading_verb(statement: &str) -> Result<(), Rejection> {
    match leading_verb(statement).as_str() {
        "SELECT" | "WITH" => Ok(()),
        "" => Err(Rejection::recoverable(
            RejectionKind::DisallowedStatement,
            "the query must start with SELECT or WITH",
        )),
        other => Err(Rejection::recoverable(
            RejectionKind::DisallowedStatement,
            format!("{other} statements are not supported; write a SELECT query"),
        )),
    }
}

fn check_structure(masked: &str, unterminated: Option<Unterminated>) -> Result<(), Rejection> {
    if let Some(kind) = unterminated {
        return Err(Rejection::recoverable(
            RejectionKind::Syntax,
            format!("unterminated {}", kind.describe()),
        ));
    }

    let mut depth: i64 = 0;
    for c in masked.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Rejection::recoverable(
                        RejectionKind::Syntax,
                        "unbalanced parentheses: unexpected ')'",
                    ));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Rejection::recoverable(
            RejectionKind::Syntax,
            "unbalanced parentheses: missing ')'",
        ));
    }
    Ok(())
}

fn check_references(masked: &str, schema: &SchemaDescription) -> Result<(), Rejection> {
    let ctes: HashSet<String> = CTE_NAME
        .captures_iter(masked)
        .map(|c| c[1].to_ascii_lowercase())
        .collect();

    for caps in TABLE_REFERENCE.captures_iter(masked) {
        // `FROM some_function(...)` is a table-valued function, not a table.
        if caps.get(2).is_some() {
            continue;
        }
        // `a IS [NOT] DISTINCT FROM b` compares values.
        let start = caps.get(0).map_or(0, |m| m.start());
        if preceding_word(masked, start).eq_ignore_ascii_case("DISTINCT") {
            continue;
        }
        let reference = &caps[1];
        let table = reference.rsplit('.').next().unwrap_or(reference);
        if ctes.contains(&table.to_ascii_lowercase()) || schema.table(table).is_some() {
            continue;
        }
        return Err(Rejection::recoverable(
            RejectionKind::UnknownReference,
            format!("table '{table}' does not exist"),
        ));
    }

    for caps in COLUMN_REFERENCE.captures_iter(masked) {
        let (qualifier, column) = (&caps[1], &caps[2]);
        let Some(table) = schema.table(qualifier) else {
            continue;
        };
        if !table.has_column(column) {
            return Err(Rejection::recoverable(
                RejectionKind::UnknownReference,
                format!("column '{column}' does not exist in table '{}'", table.name),
            ));
        }
    }
    Ok(())
}

fn preceding_word(text: &str, at: usize) -> &str {
    let before = text[..at].trim_end();
    let start = before
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .map_or(0, |i| i + 1);
    &before[start..]
}

/// Byte range from the first to the last character that is neither
/// whitespace nor `;`.
fn significant_span(masked: &str) -> Option<(usize, usize)> {
    let is_significant = |c: char| !c.is_whitespace() && c != ';';
    let start = masked.find(is_significant)?;
    let (last, ch) = masked.char_indices().rev().find(|(_, c)| is_significant(*c))?;
    Some((start, last + ch.len_utf8()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unterminated {
    Quote,
    Comment,
}

impl Unterminated {
    const fn describe(self) -> &'static str {
        match self {
            Self::Quote => "quoted string or identifier",
            Self::Comment => "block comment",
        }
    }
}

struct Masked {
    text: String,
    unterminated: Option<Unterminated>,
}

/// Blank literals, quoted identifiers and comments, preserving byte offsets.
/// Quote characters themselves are kept.
fn mask(sql: &str) -> Masked {
    let mut text = String::with_capacity(sql.len());
    let mut unterminated = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                text.push(c);
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == c {
                        if chars.peek() == Some(&c) {
                            chars.next();
                            text.push_str("  ");
                            continue;
                        }
                        text.push(c);
                        closed = true;
                        break;
                    }
                    blank(&mut text, inner);
                }
                if !closed {
                    unterminated = Some(Unterminated::Quote);
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                blank(&mut text, c);
                for inner in chars.by_ref() {
                    blank(&mut text, inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                blank(&mut text, c);
                if let Some(star) = chars.next() {
                    blank(&mut text, star);
                }
                let mut closed = false;
                let mut previous = ' ';
                for inner in chars.by_ref() {
                    blank(&mut text, inner);
                    if previous == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    previous = inner;
                }
                if !closed {
                    unterminated = Some(Unterminated::Comment);
                }
            }
            other => text.push(other),
        }
    }

    Masked { text, unterminated }
}

fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat_n(' ', c.len_utf8()));
    }
}
