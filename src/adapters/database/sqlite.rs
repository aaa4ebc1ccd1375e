//! `SQLite` executor backed by an sqlx connection pool.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, instrument, warn};

use crate::domain::errors::ExecutionError;
use crate::domain::models::{
    unique_column_labels, ColumnSchema, DatabaseConfig, ForeignKey, QueryResult, Row,
    SchemaDescription, TableSchema,
};
use crate::domain::ports::DatabaseExecutor;

const TABLES_QUERY: &str = "SELECT name FROM sqlite_master \
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name";
const COLUMNS_QUERY: &str =
    "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1) ORDER BY cid";
const FOREIGN_KEYS_QUERY: &str =
    "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq";

/// VM instructions between deadline checks.
const PROGRESS_INTERVAL_OPS: i32 = 1_000;
/// Extra wait for an interrupted statement to unwind before the connection
/// is given up on.
const INTERRUPT_GRACE: Duration = Duration::from_millis(500);
/// Primary result code of an interrupted statement.
const SQLITE_INTERRUPT: &str = "9";

/// Read-only executor for a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
    max_rows: usize,
}

impl SqliteExecutor {
    /// Open the configured database read-only.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ExecutionError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| ExecutionError::Connection(format!("invalid database URL {}: {e}", config.url)))?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.query_timeout_secs.max(1)))
            .connect_with(options)
            .await
            .map_err(|e| ExecutionError::Connection(e.to_string()))?;

        Ok(Self::from_pool(pool, config.max_rows))
    }

    pub const fn from_pool(pool: SqlitePool, max_rows: usize) -> Self {
        Self { pool, max_rows }
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn describe_table(&self, name: String) -> Result<TableSchema, ExecutionError> {
        let columns: Vec<(String, String, i64, Option<String>)> = sqlx::query_as(COLUMNS_QUERY)
            .bind(&name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExecutionError::Schema(e.to_string()))?;

        let foreign_keys: Vec<(String, String, Option<String>)> = sqlx::query_as(FOREIGN_KEYS_QUERY)
            .bind(&name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExecutionError::Schema(e.to_string()))?;

        Ok(TableSchema {
            name,
            columns: columns
                .into_iter()
                .map(|(name, data_type, not_null, default)| ColumnSchema {
                    name,
                    data_type,
                    nullable: not_null == 0,
                    default,
                })
                .collect(),
            foreign_keys: foreign_keys
                .into_iter()
                .map(|(column, references_table, to)| ForeignKey {
                    column,
                    references_table,
                    // A NULL target refers to the parent's primary key.
                    references_column: to.unwrap_or_else(|| "rowid".to_string()),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl DatabaseExecutor for SqliteExecutor {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self))]
    async fn describe_schema(&self) -> Result<SchemaDescription, ExecutionError> {
        let tables: Vec<(String,)> = sqlx::query_as(TABLES_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExecutionError::Schema(e.to_string()))?;

        let mut schema = SchemaDescription::new(self.dialect());
        for (name,) in tables {
            schema.tables.push(self.describe_table(name).await?);
        }
        debug!(tables = schema.tables.len(), "Described database schema");
        Ok(schema)
    }

    #[instrument(skip(self, sql))]
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ExecutionError> {
        let started = Instant::now();
        let deadline = started + timeout;

        let mut conn = tokio::time::timeout(timeout, self.pool.acquire())
            .await
            .map_err(|_| ExecutionError::Timeout(timeout))??;

        // SQLite checks the deadline between VM instructions and aborts the
        // statement with SQLITE_INTERRUPT once it has passed.
        conn.lock_handle()
            .await?
            .set_progress_handler(PROGRESS_INTERVAL_OPS, move || Instant::now() < deadline);

        let remaining = deadline.saturating_duration_since(Instant::now());
        let fetched = tokio::time::timeout(
            remaining + INTERRUPT_GRACE,
            collect_rows(&mut conn, sql, self.max_rows),
        )
        .await;

        let Ok(fetched) = fetched else {
            warn!(?timeout, "Query ignored interrupt, discarding connection");
            drop(conn.detach());
            return Err(ExecutionError::Timeout(timeout));
        };
        conn.lock_handle().await?.remove_progress_handler();

        let (columns, rows, truncated) = fetched.map_err(|err| {
            if is_interrupt(&err) || Instant::now() >= deadline {
                ExecutionError::Timeout(timeout)
            } else {
                ExecutionError::from(err)
            }
        })?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(rows = rows.len(), truncated, duration_ms, "Query finished");
        Ok(QueryResult::new(columns, rows)
            .with_duration_ms(duration_ms)
            .with_truncated(truncated))
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn collect_rows(
    conn: &mut SqliteConnection,
    sql: &str,
    max_rows: usize,
) -> Result<(Vec<String>, Vec<Row>, bool), sqlx::Error> {
    let mut stream = sqlx::query(sql).fetch(conn);

    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = stream.try_next().await? {
        if columns.is_empty() {
            columns = unique_column_labels(row.columns().iter().map(|c| c.name()));
        }
        if rows.len() >= max_rows {
            truncated = true;
            break;
        }
        rows.push(decode_row(&row, &columns)?);
    }
    Ok((columns, rows, truncated))
}

fn is_interrupt(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(SQLITE_INTERRUPT))
}

fn decode_row(row: &SqliteRow, columns: &[String]) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();
    for (index, name) in columns.iter().enumerate() {
        decoded.insert(name.clone(), decode_value(row, index)?);
    }
    Ok(decoded)
}

/// Decode by the value's storage class, since `SQLite` column types are
/// only affinities.
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let n = row.try_get_unchecked::<f64, _>(index)?;
            serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            let mut hex = String::with_capacity(bytes.len() * 2 + 2);
            hex.push_str("0x");
            for byte in bytes {
                let _ = write!(hex, "{byte:02x}");
            }
            Value::String(hex)
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}
