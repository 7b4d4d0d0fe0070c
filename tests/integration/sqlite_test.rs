//! SQLite client integration tests.

use super::LOCATIONS_SEED;
use db_select::config::ConnectionConfig;
use db_select::db::{
    BindParams, DatabaseClient, ExecuteDefaults, ExecuteOptions, OutFormat, Rows, SqliteClient,
    Value,
};
use db_select::runner::CITIES_SQL;

async fn seeded_client() -> SqliteClient {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let mut client = SqliteClient::connect(&config, ExecuteDefaults::default())
        .await
        .unwrap();
    client.execute_script(LOCATIONS_SEED).await.unwrap();
    client
}

#[tokio::test]
async fn test_cities_query_columns_and_order() {
    let mut client = seeded_client().await;

    let result = client
        .execute(CITIES_SQL, &BindParams::none(), &ExecuteOptions::new())
        .await
        .unwrap();

    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["location_id", "city"]);
    assert_eq!(result.row_count, 6);

    let Rows::Array(rows) = &result.rows else {
        panic!("Expected array rows");
    };
    for row in rows {
        assert!(matches!(row[0], Value::Int(_)));
        match &row[1] {
            Value::String(city) => assert!(city.starts_with('S')),
            other => panic!("Expected String for city, got {:?}", other),
        }
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hr.db");
    std::fs::File::create(&path).unwrap();

    let config = ConnectionConfig::from_connection_string(&format!("sqlite://{}", path.display()))
        .unwrap();
    let mut client = SqliteClient::connect(&config, ExecuteDefaults::default())
        .await
        .unwrap();
    client.execute_script(LOCATIONS_SEED).await.unwrap();
    client.close().await.unwrap();

    // Rows persist across connections to the same file.
    let mut client = SqliteClient::connect(&config, ExecuteDefaults::default())
        .await
        .unwrap();
    let result = client
        .execute(
            CITIES_SQL,
            &BindParams::none(),
            &ExecuteOptions::new().out_format(OutFormat::Object),
        )
        .await
        .unwrap();
    assert_eq!(result.row_count, 6);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_column_names_in_object_rows() {
    let mut client = seeded_client().await;

    let result = client
        .execute(
            "SELECT a.city, b.city FROM locations a JOIN locations b ON a.location_id = b.location_id WHERE a.location_id = 1700",
            &BindParams::none(),
            &ExecuteOptions::new().out_format(OutFormat::Object),
        )
        .await
        .unwrap();

    let Rows::Object(rows) = &result.rows else {
        panic!("Expected object rows");
    };
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["city", "city_1"]);
    assert_eq!(rows[0].get("city_1"), Some(&Value::from("Seattle")));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_null_values() {
    let mut client = seeded_client().await;

    let result = client
        .execute(
            "SELECT state_province FROM locations WHERE location_id = ?",
            &BindParams::new(vec![Value::Int(1000)]),
            &ExecuteOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.positional_rows(), vec![vec![&Value::Null]]);

    client.close().await.unwrap();
}
