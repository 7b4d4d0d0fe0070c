//! End-to-end runs of the query runner against in-memory SQLite.

use super::LOCATIONS_SEED;
use db_select::config::ConnectionConfig;
use db_select::db::{DriverConnector, ExecuteDefaults, OutFormat, Rows, Value};
use db_select::output::{OutputStyle, ResultPrinter};
use db_select::runner::{QueryRunner, RunState, Statement};
use pretty_assertions::assert_eq;

fn memory_config() -> ConnectionConfig {
    ConnectionConfig::from_connection_string("sqlite::memory:").unwrap()
}

#[tokio::test]
async fn test_run_prints_cities_in_both_formats() {
    let runner = QueryRunner::new(DriverConnector::default(), memory_config())
        .with_seed(LOCATIONS_SEED);

    let mut out = Vec::new();
    let report = runner.run(&mut out).await;
    let output = String::from_utf8(out).unwrap();

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    assert_eq!(report.state, RunState::Closed);
    assert_eq!(
        output,
        "----- Cities beginning with 'S' (default ARRAY output format) --------\n\
         [2800, \"Sao Paulo\"]\n\
         [1700, \"Seattle\"]\n\
         [2300, \"Singapore\"]\n\
         [1500, \"South San Francisco\"]\n\
         [1400, \"Southlake\"]\n\
         [2200, \"Sydney\"]\n\
         ----- Cities beginning with 'S' (OBJECT output format) --------\n\
         {location_id: 2800, city: \"Sao Paulo\"}\n\
         {location_id: 1700, city: \"Seattle\"}\n\
         {location_id: 2300, city: \"Singapore\"}\n\
         {location_id: 1500, city: \"South San Francisco\"}\n\
         {location_id: 1400, city: \"Southlake\"}\n\
         {location_id: 2200, city: \"Sydney\"}\n"
    );
}

#[tokio::test]
async fn test_run_results_are_the_same_rows() {
    let runner = QueryRunner::new(DriverConnector::default(), memory_config())
        .with_seed(LOCATIONS_SEED);

    let report = runner.run(&mut Vec::new()).await;
    let default = report.default_result.unwrap();
    let object = report.object_result.unwrap();

    assert_eq!(default.out_format(), OutFormat::Array);
    assert_eq!(object.out_format(), OutFormat::Object);
    assert_eq!(default.positional_rows(), object.positional_rows());

    let Rows::Object(rows) = &object.rows else {
        panic!("Expected object rows");
    };
    let cities: Vec<&Value> = rows.iter().filter_map(|row| row.get("city")).collect();
    let mut sorted = cities.clone();
    sorted.sort_by_key(|v| v.to_display_string());
    assert_eq!(cities, sorted);
}

#[tokio::test]
async fn test_run_with_object_default_labels_both_as_object() {
    let defaults = ExecuteDefaults {
        out_format: OutFormat::Object,
        max_rows: 0,
    };
    let runner = QueryRunner::new(DriverConnector::new(defaults), memory_config())
        .with_seed(LOCATIONS_SEED);

    let mut out = Vec::new();
    runner.run(&mut out).await;
    let output = String::from_utf8(out).unwrap();

    assert!(output.contains("(default OBJECT output format)"));
    assert!(!output.contains("ARRAY"));
}

#[tokio::test]
async fn test_run_without_table_still_closes() {
    let runner = QueryRunner::new(DriverConnector::default(), memory_config());

    let mut out = Vec::new();
    let report = runner.run(&mut out).await;

    assert_eq!(report.state, RunState::Closed);
    assert_eq!(report.error.unwrap().category(), "Query Error");
    assert!(report.release_error.is_none());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_run_with_unreachable_database() {
    let config = ConnectionConfig {
        connect_string: Some("/nonexistent/dir/hr.db".to_string()),
        ..memory_config()
    };
    let runner = QueryRunner::new(DriverConnector::default(), config);

    let report = runner.run(&mut Vec::new()).await;

    assert_eq!(report.state, RunState::Error);
    assert_eq!(report.error.unwrap().category(), "Connection Error");
    assert!(report.default_result.is_none());
}

#[tokio::test]
async fn test_run_custom_statement_as_json() {
    let statement = Statement::new("SELECT city FROM locations WHERE country_id = ? ORDER BY city")
        .with_binds(vec![Value::from("IT")].into())
        .with_title("Italian cities");
    let runner = QueryRunner::new(DriverConnector::default(), memory_config())
        .with_seed(LOCATIONS_SEED)
        .with_statement(statement)
        .with_printer(ResultPrinter::new(OutputStyle::Json));

    let mut out = Vec::new();
    let report = runner.run(&mut out).await;
    assert!(report.succeeded());

    let output = String::from_utf8(out).unwrap();
    let documents: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(documents.len(), 2);
    assert_eq!(
        documents[0]["label"],
        "----- Italian cities (default ARRAY output format) --------"
    );
    assert_eq!(documents[0]["rows"], serde_json::json!([["Roma"], ["Venice"]]));
    assert_eq!(
        documents[1]["rows"],
        serde_json::json!([{"city": "Roma"}, {"city": "Venice"}])
    );
}

#[tokio::test]
async fn test_run_filter_is_case_sensitive() {
    let seed = "CREATE TABLE locations (location_id INTEGER PRIMARY KEY, city TEXT NOT NULL);
                INSERT INTO locations VALUES (1, 'Seattle'), (2, 'stuttgart');";
    let runner = QueryRunner::new(DriverConnector::default(), memory_config()).with_seed(seed);

    let mut out = Vec::new();
    let report = runner.run(&mut out).await;
    let output = String::from_utf8(out).unwrap();

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    assert_eq!(report.default_result.unwrap().row_count, 1);
    assert_eq!(report.object_result.unwrap().row_count, 1);
    assert!(!output.contains("stuttgart"));
}
