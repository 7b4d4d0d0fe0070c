//! Postgres integration tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use super::LOCATIONS_SEED;
use db_select::config::ConnectionConfig;
use db_select::db::{
    BindParams, DatabaseClient, DriverConnector, ExecuteDefaults, ExecuteOptions, PostgresClient,
};
use db_select::runner::{QueryRunner, RunState};

/// Helper to get a connection config from the environment.
fn get_test_config() -> Option<ConnectionConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

/// Runs inside a temporary table so the test database is left untouched.
fn temp_seed() -> String {
    LOCATIONS_SEED.replace("CREATE TABLE locations", "CREATE TEMPORARY TABLE locations")
}

#[tokio::test]
async fn test_runner_against_postgres() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let runner = QueryRunner::new(DriverConnector::default(), config).with_seed(temp_seed());
    let mut out = Vec::new();
    let report = runner.run(&mut out).await;

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    assert_eq!(report.state, RunState::Closed);

    let default = report.default_result.unwrap();
    let object = report.object_result.unwrap();
    assert_eq!(default.row_count, 6);
    assert_eq!(default.positional_rows(), object.positional_rows());
}

#[tokio::test]
async fn test_empty_result_has_columns() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let mut client = PostgresClient::connect(&config, ExecuteDefaults::default())
        .await
        .unwrap();
    let result = client
        .execute(
            "SELECT 1 AS location_id, 'x' AS city WHERE 1 = 0",
            &BindParams::none(),
            &ExecuteOptions::new(),
        )
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[1].name, "city");

    client.close().await.unwrap();
}
