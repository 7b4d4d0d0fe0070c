//! db-select - Runs a SQL query and prints its rows as arrays and as objects.
//!
//! This library exposes the core modules for use by the binary and by
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod runner;
