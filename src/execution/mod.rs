//! Cell execution.
//!
//! The [`ExecutionController`] runs batches of cells against the configured
//! pool and reports each cell's lifecycle over an `mpsc` channel.

mod controller;
mod output;

pub use controller::{
    CellTask, ExecutionController, INTERNAL_ERROR_MESSAGE, NO_CONNECTION_MESSAGE, SUCCESS_MESSAGE,
};
pub use output::{CellOutput, CellReport, ExecutionEvent, OutputItem};
