//! Mock pool for testing.
//!
//! Serves scripted responses, optionally after a delay, and counts how its
//! connections were handed out and given back.

use super::{ColumnInfo, Connection, ExecutionResult, Pool, TabularResult, Value};
use crate::error::{NotebookError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A scripted reply for the next query.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// The query succeeds with this result.
    Result(ExecutionResult),
    /// The query fails with this database message.
    Error(String),
}

/// Counters describing what happened to the pool's connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub acquired: usize,
    pub released: usize,
    pub destroyed: usize,
    pub ended: bool,
}

#[derive(Default)]
struct MockState {
    responses: Mutex<VecDeque<MockResponse>>,
    queries: Mutex<Vec<String>>,
    latency: Duration,
    acquire_error: Option<String>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    destroyed: AtomicUsize,
    ended: AtomicBool,
}

/// A pool whose connections answer from a script.
///
/// Unscripted queries fall back to a canned answer: statements starting with
/// `SELECT` return one row echoing the SQL, anything else returns no tables.
#[derive(Clone, Default)]
pub struct MockPool {
    state: Arc<MockState>,
}

impl MockPool {
    /// Creates a mock pool with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock pool that answers queries from `responses`, in order.
    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self::build(responses.into_iter().collect(), Duration::ZERO, None)
    }

    /// Delays every query by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        let responses = self.take_script();
        Self::build(responses, latency, self.state.acquire_error.clone())
    }

    /// Creates a mock pool whose `acquire` always fails with `message`.
    pub fn failing_acquire(message: impl Into<String>) -> Self {
        Self::build(VecDeque::new(), Duration::ZERO, Some(message.into()))
    }

    fn build(
        responses: VecDeque<MockResponse>,
        latency: Duration,
        acquire_error: Option<String>,
    ) -> Self {
        Self {
            state: Arc::new(MockState {
                responses: Mutex::new(responses),
                latency,
                acquire_error,
                ..Default::default()
            }),
        }
    }

    fn take_script(&self) -> VecDeque<MockResponse> {
        self.state
            .responses
            .try_lock()
            .map(|mut responses| std::mem::take(&mut *responses))
            .unwrap_or_default()
    }

    /// Returns a snapshot of the connection counters.
    pub fn stats(&self) -> MockStats {
        MockStats {
            acquired: self.state.acquired.load(Ordering::SeqCst),
            released: self.state.released.load(Ordering::SeqCst),
            destroyed: self.state.destroyed.load(Ordering::SeqCst),
            ended: self.state.ended.load(Ordering::SeqCst),
        }
    }

    /// Returns every statement text received so far, in order.
    pub async fn executed_queries(&self) -> Vec<String> {
        self.state.queries.lock().await.clone()
    }
}

#[async_trait]
impl Pool for MockPool {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        if self.state.ended.load(Ordering::SeqCst) {
            return Err(NotebookError::connection("Pool is closed"));
        }
        if let Some(message) = &self.state.acquire_error {
            return Err(NotebookError::connection(message.clone()));
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }

    async fn end(&self) {
        self.state.ended.store(true, Ordering::SeqCst);
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, sql: &str) -> Result<ExecutionResult> {
        self.state.queries.lock().await.push(sql.to_string());

        if !self.state.latency.is_zero() {
            tokio::time::sleep(self.state.latency).await;
        }

        let scripted = self.state.responses.lock().await.pop_front();
        match scripted {
            Some(MockResponse::Result(result)) => Ok(result),
            Some(MockResponse::Error(message)) => Err(NotebookError::query(message)),
            None => Ok(canned_result(sql)),
        }
    }

    fn release(self: Box<Self>) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }

    async fn destroy(self: Box<Self>) {
        self.state.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

fn canned_result(sql: &str) -> ExecutionResult {
    if sql.trim_start().to_uppercase().starts_with("SELECT") {
        ExecutionResult::Tables(vec![TabularResult::with_data(
            vec![ColumnInfo::new("result", "text")],
            vec![vec![Value::String(format!("Mock result for: {sql}"))]],
        )])
    } else {
        ExecutionResult::Tables(vec![])
    }
}
