//! Error types for sql-notebook.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for notebook operations.
#[derive(Error, Debug)]
pub enum NotebookError {
    /// Pool creation or acquisition errors (host unreachable, pool closed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (no active pool, invalid config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query was cancelled while it was in flight.
    #[error("Query cancelled")]
    Cancelled,

    /// Internal errors (unrecognized notebook type, unexpected states, bugs).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Reading or writing documents and config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotebookError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Cancelled => "Cancelled",
            Self::Internal(_) => "Internal Error",
            Self::Io(_) => "I/O Error",
        }
    }

    /// Returns the bare message without the category prefix.
    ///
    /// This is what a cell shows as its error output.
    pub fn message(&self) -> String {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Cancelled => "Query cancelled".to_string(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Result type alias using NotebookError.
pub type Result<T> = std::result::Result<T, NotebookError>;
