//! Executes notebook cells against the configured pool.
//!
//! A batch runs as one task: cells execute strictly in the order given, each
//! one acquiring its own connection, and the next cell starts only once the
//! previous one has reported `Finished`. A failing cell never stops the batch.

use super::output::{now_millis, CellOutput, CellReport, ExecutionEvent, OutputItem};
use crate::config::OutputSettings;
use crate::db::{ExecutionResult, Pool};
use crate::error::NotebookError;
use crate::notebook::{slt, Cell, CellId, Dialect, DocumentCell};
use crate::render::render_table;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Shown when no pool has been configured.
pub const NO_CONNECTION_MESSAGE: &str =
    "No active connection found. Configure database connections in the SQL Notebook sidepanel.";

/// Shown for statements that produced nothing to display.
pub const SUCCESS_MESSAGE: &str = "Successfully executed query";

/// Shown when the notebook type is not one this controller serves.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error happened";

/// A cell queued for execution together with its cancellation token.
#[derive(Debug, Clone)]
pub struct CellTask {
    pub id: CellId,
    pub cell: Cell,
    pub cancel: CancellationToken,
}

impl CellTask {
    pub fn new(id: CellId, cell: Cell) -> Self {
        Self {
            id,
            cell,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `cancel` interrupts this cell only.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl From<&DocumentCell> for CellTask {
    fn from(cell: &DocumentCell) -> Self {
        Self::new(cell.id, cell.cell.clone())
    }
}

/// Runs cells and reports their lifecycle as [`ExecutionEvent`]s.
pub struct ExecutionController {
    settings: OutputSettings,
    pool: RwLock<Option<Arc<dyn Pool>>>,
    sql_execution_order: AtomicU64,
    slt_execution_order: AtomicU64,
}

impl ExecutionController {
    /// Creates a controller. `pool` is `None` until a connection is configured.
    pub fn new(settings: OutputSettings, pool: Option<Arc<dyn Pool>>) -> Self {
        Self {
            settings,
            pool: RwLock::new(pool),
            sql_execution_order: AtomicU64::new(0),
            slt_execution_order: AtomicU64::new(0),
        }
    }

    /// Replaces the active pool, ending the previous one.
    pub async fn set_pool(&self, pool: Option<Arc<dyn Pool>>) {
        let previous = std::mem::replace(&mut *self.pool.write().await, pool);
        if let Some(previous) = previous {
            previous.end().await;
        }
    }

    /// Check if there's an active pool.
    pub async fn has_pool(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// Ends the active pool. Later cells fail with the no-connection message.
    pub async fn dispose(&self) {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.end().await;
        }
    }

    /// Executes `tasks` one after another for a document of `notebook_type`.
    pub async fn execute(
        &self,
        notebook_type: &str,
        tasks: Vec<CellTask>,
        events: &mpsc::Sender<ExecutionEvent>,
    ) {
        let dialect = Dialect::from_notebook_type(notebook_type);

        for task in tasks {
            match dialect {
                Some(dialect) => self.execute_cell(dialect, task, events).await,
                None => {
                    error!("something strange happened, notebook type: {notebook_type}");
                    let run = CellRun::start(task.id, None, events).await;
                    run.fail(NotebookError::internal(INTERNAL_ERROR_MESSAGE).message())
                        .await;
                }
            }
        }
    }

    async fn execute_cell(
        &self,
        dialect: Dialect,
        task: CellTask,
        events: &mpsc::Sender<ExecutionEvent>,
    ) {
        let order = self.next_execution_order(dialect);
        let run = CellRun::start(task.id, Some(order), events).await;

        let sql = match dialect {
            Dialect::PlainSql => task.cell.content,
            Dialect::RegressionTest => slt::translate(&task.cell.content),
        };

        let pool = self.pool.read().await.clone();
        let Some(pool) = pool else {
            run.fail(NO_CONNECTION_MESSAGE).await;
            return;
        };

        let acquired = tokio::select! {
            biased;

            _ = task.cancel.cancelled() => Err(NotebookError::Cancelled),
            conn = pool.acquire() => conn,
        };
        let mut conn = match acquired {
            Ok(conn) => conn,
            Err(e) => {
                debug!(cell = %task.id, "could not acquire connection: {e}");
                run.fail(e.message()).await;
                return;
            }
        };

        debug!(cell = %task.id, query = %sql, "executing query");
        let outcome = tokio::select! {
            biased;

            _ = task.cancel.cancelled() => None,
            result = conn.query(&sql) => Some(result),
        };

        match outcome {
            None => {
                debug!(cell = %task.id, "got cancellation request");
                conn.destroy().await;
                run.fail(NotebookError::Cancelled.message()).await;
            }
            Some(Err(e)) => {
                debug!(cell = %task.id, "sql query failed: {e}");
                conn.release();
                run.fail(e.message()).await;
            }
            Some(Ok(result)) => {
                debug!(cell = %task.id, "sql query completed");
                conn.release();
                run.succeed(self.render(result)).await;
            }
        }
    }

    fn next_execution_order(&self, dialect: Dialect) -> u64 {
        let counter = match dialect {
            Dialect::PlainSql => &self.sql_execution_order,
            Dialect::RegressionTest => &self.slt_execution_order,
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Builds the outputs for a successful query.
    fn render(&self, result: ExecutionResult) -> Vec<CellOutput> {
        if result.is_blank() {
            return vec![CellOutput::text(SUCCESS_MESSAGE)];
        }

        match result {
            ExecutionResult::Status(status) => vec![CellOutput::text(status)],
            ExecutionResult::Tables(tables) => tables
                .iter()
                .map(|table| {
                    let mut items = vec![OutputItem::Markdown(render_table(table, &self.settings))];
                    if self.settings.json {
                        items.push(OutputItem::Json(table.to_json()));
                    }
                    CellOutput { items }
                })
                .collect(),
        }
    }
}

/// A started cell execution. Finishing consumes it, so every cell reports
/// `Finished` exactly once.
struct CellRun<'a> {
    cell: CellId,
    execution_order: Option<u64>,
    events: &'a mpsc::Sender<ExecutionEvent>,
}

impl<'a> CellRun<'a> {
    async fn start(
        cell: CellId,
        execution_order: Option<u64>,
        events: &'a mpsc::Sender<ExecutionEvent>,
    ) -> CellRun<'a> {
        let _ = events
            .send(ExecutionEvent::Started {
                cell,
                execution_order,
                started_at_ms: now_millis(),
            })
            .await;

        Self {
            cell,
            execution_order,
            events,
        }
    }

    async fn succeed(self, outputs: Vec<CellOutput>) {
        self.finish(true, outputs).await;
    }

    async fn fail(self, message: impl Into<String>) {
        self.finish(false, vec![CellOutput::text(message)]).await;
    }

    async fn finish(self, success: bool, outputs: Vec<CellOutput>) {
        let _ = self
            .events
            .send(ExecutionEvent::Finished(CellReport {
                cell: self.cell,
                execution_order: self.execution_order,
                success,
                outputs,
                ended_at_ms: now_millis(),
            }))
            .await;
    }
}
