//! Database abstraction layer.
//!
//! Cells are executed against a [`Pool`] that hands out one [`Connection`] per
//! cell. Backends are interchangeable behind these traits.

mod mock;
mod postgres;
mod sqlite;
mod types;

pub use mock::{MockPool, MockResponse, MockStats};
pub use postgres::PostgresPool;
pub use sqlite::SqlitePool;
pub use types::{ColumnInfo, ExecutionResult, Row, TabularResult, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string or URL scheme.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Creates a pool for the given backend and configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn Pool>> {
    match config.backend {
        DatabaseBackend::Postgres => Ok(Arc::new(PostgresPool::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Arc::new(SqlitePool::connect(config).await?)),
    }
}

/// A manager of reusable connections.
#[async_trait]
pub trait Pool: Send + Sync {
    /// Checks out a connection. Fails once the pool has been ended.
    async fn acquire(&self) -> Result<Box<dyn Connection>>;

    /// Closes the pool. Every later `acquire` fails.
    async fn end(&self);
}

/// A connection checked out of a [`Pool`].
///
/// `release` and `destroy` consume the handle, so a connection is given back
/// or torn down exactly once.
#[async_trait]
pub trait Connection: Send {
    /// Executes the statement text, which may hold several `;`-terminated
    /// statements.
    async fn query(&mut self, sql: &str) -> Result<ExecutionResult>;

    /// Returns the connection to its pool for reuse.
    fn release(self: Box<Self>);

    /// Closes the connection and removes it from the pool for good.
    async fn destroy(self: Box<Self>);
}

/// Accumulates a multi-statement result stream into an [`ExecutionResult`].
///
/// Drivers emit rows followed by a completion marker per statement; each
/// statement becomes one table.
#[derive(Debug, Default)]
pub(crate) struct StatementCollector {
    tables: Vec<TabularResult>,
    current: TabularResult,
    pending: bool,
    saw_rows: bool,
    rows_affected: u64,
}

impl StatementCollector {
    /// Adds a row to the statement in progress. `columns` is only consulted
    /// for the statement's first row.
    pub(crate) fn push_row(&mut self, columns: impl FnOnce() -> Vec<ColumnInfo>, row: Row) {
        if self.current.columns.is_empty() {
            self.current.columns = columns();
        }
        self.current.rows.push(row);
        self.pending = true;
        self.saw_rows = true;
    }

    /// Closes the statement in progress.
    pub(crate) fn finish_statement(&mut self, rows_affected: u64) {
        self.rows_affected += rows_affected;
        self.tables.push(std::mem::take(&mut self.current));
        self.pending = false;
    }

    /// Replaces the per-statement counts with a total measured by the caller.
    pub(crate) fn set_rows_affected(&mut self, rows_affected: u64) {
        self.rows_affected = rows_affected;
    }

    /// Without any rows but with affected rows the batch reads best as a
    /// status line.
    pub(crate) fn finish(mut self) -> ExecutionResult {
        if self.pending {
            self.tables.push(std::mem::take(&mut self.current));
        }

        if !self.saw_rows && self.rows_affected > 0 {
            let plural = if self.rows_affected == 1 { "" } else { "s" };
            return ExecutionResult::Status(format!(
                "{} row{plural} affected",
                self.rows_affected
            ));
        }

        ExecutionResult::Tables(self.tables)
    }
}
