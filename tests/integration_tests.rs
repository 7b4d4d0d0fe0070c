//! Integration tests for db-select.
//!
//! SQLite tests run against in-memory databases. Postgres tests require a
//! running database and are skipped unless DATABASE_URL is set.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
