//! SQLite pool implementation.
//!
//! Handy for local scratch notebooks and for exercising the full pipeline
//! without a server.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, Connection, ExecutionResult, Pool, Row, StatementCollector, Value};
use crate::error::{NotebookError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Connection as _, Either, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    pool: sqlx::SqlitePool,
}

impl SqlitePool {
    /// Opens a pool for the configured database file.
    ///
    /// An in-memory database lives per connection, so it is capped at a
    /// single pooled connection to keep state visible across cells.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| NotebookError::config(format!("Invalid database path: {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(10));
        pool_options = if config.path.is_none() {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| NotebookError::connection(format!("Failed to open SQLite database: {e}")))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }

    /// Opens a fresh in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&ConnectionConfig::from_connection_string("sqlite::memory:")?).await
    }
}

#[async_trait]
impl Pool for SqlitePool {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| NotebookError::connection(format!("Failed to acquire connection: {e}")))?;
        Ok(Box::new(SqliteConnection { conn }))
    }

    async fn end(&self) {
        self.pool.close().await;
    }
}

/// A connection checked out of a [`SqlitePool`].
pub struct SqliteConnection {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&mut self, sql: &str) -> Result<ExecutionResult> {
        let mut collector = StatementCollector::default();
        let before = self.total_changes().await?;

        {
            let mut stream = sqlx::raw_sql(sql).fetch_many(&mut *self.conn);
            while let Some(item) = stream
                .try_next()
                .await
                .map_err(|e| NotebookError::query(format_query_error(e)))?
            {
                match item {
                    // sqlite3_changes() keeps the last DML count through SELECT and DDL
                    Either::Left(_) => collector.finish_statement(0),
                    Either::Right(row) => {
                        collector.push_row(|| column_info(&row), convert_row(&row))
                    }
                }
            }
        }

        let after = self.total_changes().await?;
        collector.set_rows_affected(after.saturating_sub(before));
        Ok(collector.finish())
    }

    fn release(self: Box<Self>) {
        drop(self.conn);
    }

    async fn destroy(self: Box<Self>) {
        if let Err(e) = self.conn.detach().close().await {
            warn!("Error while closing destroyed connection: {e}");
        }
    }
}

impl SqliteConnection {
    /// Rows changed on this connection since it was opened.
    async fn total_changes(&mut self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT total_changes()")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| NotebookError::query(format_query_error(e)))?;
        Ok(total.max(0) as u64)
    }
}

fn column_info(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// SQLite is dynamically typed, so the value's own storage class decides the
/// variant rather than the declared column type.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage.as_str() {
        "BOOLEAN" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INTEGER" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("ERROR: {}", db_error.message()),
        None => error.to_string(),
    }
}
