//! PostgreSQL pool implementation.
//!
//! Provides `PostgresPool`, a [`Pool`] backed by a sqlx `PgPool`. Cell text is
//! sent over the simple query protocol so a cell may hold several statements.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, Connection, ExecutionResult, Pool, Row, StatementCollector, Value};
use crate::error::{NotebookError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as _, Connection as _, Either, Postgres, Row as _, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Opens a pool, retrying transient failures with exponential backoff.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(NotebookError::connection("No connection attempt was made")),
        }
    }
}

#[async_trait]
impl Pool for PostgresPool {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| NotebookError::connection(format!("Failed to acquire connection: {e}")))?;
        Ok(Box::new(PostgresConnection { conn }))
    }

    async fn end(&self) {
        self.pool.close().await;
    }
}

/// A connection checked out of a [`PostgresPool`].
pub struct PostgresConnection {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn query(&mut self, sql: &str) -> Result<ExecutionResult> {
        let mut collector = StatementCollector::default();
        let mut stream = sqlx::raw_sql(sql).fetch_many(&mut *self.conn);

        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|e| NotebookError::query(format_query_error(e)))?
        {
            match item {
                Either::Left(done) => collector.finish_statement(done.rows_affected()),
                Either::Right(row) => collector.push_row(|| column_info(&row), convert_row(&row)),
            }
        }

        Ok(collector.finish())
    }

    fn release(self: Box<Self>) {
        // Dropping a PoolConnection hands it back to the pool.
        drop(self.conn);
    }

    async fn destroy(self: Box<Self>) {
        if let Err(e) = self.conn.detach().close().await {
            warn!("Error while closing destroyed connection: {e}");
        }
    }
}

fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(widen_f32(v)))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .map(Value::Json)
            .unwrap_or(Value::Null),

        // Simple-protocol values arrive as text, so everything else keeps the
        // server's own rendering.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Widens through the shortest decimal form so `1.1::float4` stays `1.1`.
fn widen_f32(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(value as f64)
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> NotebookError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        NotebookError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        NotebookError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        NotebookError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        NotebookError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        NotebookError::connection(error.to_string())
    }
}

/// Formats a query error with the server's detail and hint when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
