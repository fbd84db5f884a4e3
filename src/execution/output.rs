//! What a cell execution reports back to its host.

use crate::notebook::CellId;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One payload inside a cell output, tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mime", content = "data")]
pub enum OutputItem {
    #[serde(rename = "text/plain")]
    Text(String),
    #[serde(rename = "text/markdown")]
    Markdown(String),
    #[serde(rename = "application/json")]
    Json(serde_json::Value),
}

impl OutputItem {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Text(_) => "text/plain",
            Self::Markdown(_) => "text/markdown",
            Self::Json(_) => "application/json",
        }
    }
}

/// A group of alternative representations of the same output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellOutput {
    pub items: Vec<OutputItem>,
}

impl CellOutput {
    /// A single plain-text output.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            items: vec![OutputItem::Text(text.into())],
        }
    }

    /// The first plain-text item, if any.
    pub fn as_text(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            OutputItem::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// The final state of one cell execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    pub cell: CellId,
    pub execution_order: Option<u64>,
    pub success: bool,
    /// Replaces whatever the cell showed before.
    pub outputs: Vec<CellOutput>,
    pub ended_at_ms: u64,
}

/// Lifecycle notifications sent to the host, exactly one `Started` and one
/// `Finished` per cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Started {
        cell: CellId,
        execution_order: Option<u64>,
        started_at_ms: u64,
    },
    Finished(CellReport),
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
