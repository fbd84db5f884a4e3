//! SQL Notebook - run SQL and sqllogictest notebooks against a database.
//!
//! This library exposes the core modules for use by the `sqlnb` binary and
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod logging;
pub mod notebook;
pub mod render;
