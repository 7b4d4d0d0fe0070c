//! SQLite database client implementation.
//!
//! Uses a single sqlx `SqliteConnection`, so `:memory:` databases live
//! exactly as long as the client.

use crate::config::{ConnectTarget, ConnectionConfig, SQLITE_MEMORY};
use crate::db::{
    BindParams, ColumnInfo, DatabaseBackend, DatabaseClient, ExecuteDefaults, ExecuteOptions,
    QueryResult, Row, Value,
};
use crate::error::{Result, SelectError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as SqlxColumn, Connection, Executor, Row as SqlxRow, Sqlite, Statement, TypeInfo,
    ValueRef,
};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, warn};

/// SQLite database client owning one connection.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Option<SqliteConnection>,
    defaults: ExecuteDefaults,
}

impl SqliteClient {
    /// Opens the database file (or in-memory database) named by `config`.
    ///
    /// The file must already exist.
    pub async fn connect(config: &ConnectionConfig, defaults: ExecuteDefaults) -> Result<Self> {
        let ConnectTarget::Sqlite { filename } = config.target()? else {
            return Err(SelectError::config(
                "SQLite client needs a file path or :memory: connect string",
            ));
        };

        if config.user.is_some() || config.password.is_some() {
            debug!("SQLite does not use credentials; ignoring user and password");
        }

        let options = if filename == SQLITE_MEMORY {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| SelectError::config(format!("Invalid SQLite options: {e}")))?
        } else {
            SqliteConnectOptions::new().filename(&filename)
        };
        // LIKE matches case-sensitively, as on Postgres.
        let options = options.pragma("case_sensitive_like", "ON");

        debug!("Opening sqlite database {filename}");
        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| {
                SelectError::connection(format!("Cannot open SQLite database '{filename}': {e}"))
            })?;

        Ok(Self {
            conn: Some(conn),
            defaults,
        })
    }

    fn conn_mut(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SelectError::connection("Connection is closed"))
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
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
                .map_err(|e| SelectError::query(e.to_string()))?
            {
                if columns.is_none() {
                    columns = Some(column_info(&row));
                }
                if limit.is_some_and(|limit| rows.len() >= limit) {
                    was_truncated = true;
                    break;
                }
                rows.push(convert_row(&row));
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
            .map_err(|e| SelectError::query(e.to_string()))?;
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

/// Binds every value positionally (`?`, `?1`, ...).
fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &'q BindParams,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
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
async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<ColumnInfo> {
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

fn column_info(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts one value using its storage class rather than the declared type,
/// since SQLite columns may hold any type.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row
            .try_get::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "BOOLEAN" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
