//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using a single sqlx connection.

use crate::config::{ConnectTarget, ConnectionConfig};
use crate::db::{
    BindParams, ColumnInfo, DatabaseBackend, DatabaseClient, ExecuteDefaults, ExecuteOptions,
    QueryResult, Row, Value,
};
use crate::error::{Result, SelectError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{
    Column as SqlxColumn, Connection, Executor, Postgres, Row as SqlxRow, Statement, TypeInfo,
};
use std::time::Instant;
use tracing::{debug, warn};

/// PostgreSQL database client owning one connection.
#[derive(Debug)]
pub struct PostgresClient {
    conn: Option<PgConnection>,
    defaults: ExecuteDefaults,
}

impl PostgresClient {
    /// Opens a connection described by `config`.
    ///
    /// Unset fields fall back to the libpq environment (`PGHOST`, `PGUSER`, ...).
    pub async fn connect(config: &ConnectionConfig, defaults: ExecuteDefaults) -> Result<Self> {
        let ConnectTarget::Postgres {
            host,
            port,
            database,
        } = config.target()?
        else {
            return Err(SelectError::config(
                "Postgres client needs a host[:port]/database connect string",
            ));
        };

        let mut options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&database);
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        debug!("Connecting to postgres at {host}:{port}/{database}");
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| map_connection_error(e, config, &host, port, &database))?;
        debug!("Successfully connected to database");

        Ok(Self {
            conn: Some(conn),
            defaults,
        })
    }

    fn conn_mut(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SelectError::connection("Connection is closed"))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn execute(
        &mut self,
        sql: &str,
        binds: &BindParams,
        options: &ExecuteOptions,
    ) -> Result<QueryResult> {
        let format = options.effective_format(&self.defaults);
        let limit = options.effective_limit(&self.defaults);
        let conn = self.conn_mut()?;
        let start = Instant::now();

        let mut columns: Option<Vec<ColumnInfo>> = None;
        let mut rows: Vec<Row> = Vec::new();
        let mut was_truncated = false;
        {
            let mut stream = bind_all(sqlx::query(sql), binds).fetch(&mut *conn);
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| SelectError::query(format_query_error(e)))?
            {
                if columns.is_none() {
                    columns = Some(column_info(&row));
                }
                if limit.is_some_and(|limit| rows.len() >= limit) {
                    was_truncated = true;
                    break;
                }
                rows.push(convert_row(&row)?);
            }
        }
        let execution_time = start.elapsed();

        let columns = match columns {
            Some(columns) => columns,
            None => describe_columns(conn, sql).await,
        };

        if was_truncated {
            warn!("Query stopped at the row limit of {} rows", rows.len());
        }

        let result = QueryResult::from_rows(columns, rows, format).with_execution_time(execution_time);
        Ok(if was_truncated { result.truncated() } else { result })
    }

    async fn execute_script(&mut self, script: &str) -> Result<()> {
        let conn = self.conn_mut()?;
        conn.execute(script)
            .await
            .map_err(|e| SelectError::query(format_query_error(e)))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| SelectError::connection("Connection is already closed"))?;
        conn.close()
            .await
            .map_err(|e| SelectError::connection(format!("Failed to close connection: {e}")))
    }
}

/// Binds every value positionally (`$1`, `$2`, ...).
fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: &'q BindParams,
) -> Query<'q, Postgres, PgArguments> {
    for value in binds.iter() {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Column metadata for a statement that returned no rows.
async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<ColumnInfo> {
    match (&mut *conn).prepare(sql).await {
        Ok(statement) => statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            debug!("Could not prepare statement for column metadata: {e}");
            Vec::new()
        }
    }
}

fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|col| convert_value(row, col.ordinal(), col.name(), col.type_info().name()))
        .collect()
}

/// Decodes one column by its Postgres type name.
///
/// Types without a native mapping are read as text; a column that cannot be
/// read as text is a query error, never a silent NULL.
fn convert_value(row: &PgRow, index: usize, column: &str, type_name: &str) -> Result<Value> {
    match type_name {
        "BOOL" => decode(row, index, column, Value::Bool),
        "INT2" => decode(row, index, column, |v: i16| Value::Int(v.into())),
        "INT4" => decode(row, index, column, |v: i32| Value::Int(v.into())),
        "INT8" => decode(row, index, column, Value::Int),
        "OID" => decode(row, index, column, |v: Oid| Value::Int(v.0.into())),
        "FLOAT4" => decode(row, index, column, |v: f32| Value::Float(v.into())),
        "FLOAT8" => decode(row, index, column, Value::Float),
        "NUMERIC" => decode(row, index, column, numeric_value),
        "BYTEA" => decode(row, index, column, Value::Bytes),
        "DATE" => decode(row, index, column, |v: NaiveDate| Value::String(v.to_string())),
        "TIME" => decode(row, index, column, |v: NaiveTime| Value::String(v.to_string())),
        "TIMESTAMP" => decode(row, index, column, |v: NaiveDateTime| {
            Value::String(v.to_string())
        }),
        "TIMESTAMPTZ" => decode(row, index, column, |v: DateTime<Utc>| {
            Value::String(v.to_rfc3339())
        }),
        "UUID" => decode(row, index, column, |v: Uuid| Value::String(v.to_string())),
        "JSON" | "JSONB" => decode(row, index, column, |v: JsonValue| {
            Value::String(v.to_string())
        }),
        _ => decode(row, index, column, Value::String),
    }
}

fn decode<'r, T>(
    row: &'r PgRow,
    index: usize,
    column: &str,
    to_value: impl FnOnce(T) -> Value,
) -> Result<Value>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map(|value| value.map(to_value).unwrap_or(Value::Null))
        .map_err(|e| SelectError::query(format!("Cannot read column '{column}': {e}")))
}

/// Whole numbers that fit in an i64 become integers; everything else keeps
/// its exact decimal text.
fn numeric_value(value: BigDecimal) -> Value {
    let text = value.to_string();
    match text.parse::<i64>() {
        Ok(int) => Value::Int(int),
        Err(_) => Value::String(text),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(
    error: sqlx::Error,
    config: &ConnectionConfig,
    host: &str,
    port: u16,
    database: &str,
) -> SelectError {
    let user = config.user.as_deref().unwrap_or("unknown");
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SelectError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SelectError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SelectError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        SelectError::connection(
            "Server requires SSL. Check the server's TLS settings.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SelectError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SelectError::connection(error.to_string())
    }
}

/// Formats a query error with Postgres detail and hint fields if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
