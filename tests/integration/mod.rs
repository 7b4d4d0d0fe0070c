//! Integration tests for db-select.

pub mod postgres_test;
pub mod runner_test;
pub mod sqlite_test;

/// Seed script creating and filling the `locations` table.
pub const LOCATIONS_SEED: &str = include_str!("../fixtures/locations.sql");
