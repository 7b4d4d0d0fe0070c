//! Database abstraction layer for db-select.
//!
//! Provides a trait-based interface over the database driver: a
//! [`Connector`] acquires sessions, a [`DatabaseClient`] executes statements
//! on one session, and a [`ConnectionHandle`] owns that session until it is
//! released.

mod handle;
mod mock;
mod postgres;
mod sqlite;
mod types;

pub use handle::ConnectionHandle;
pub use mock::{ExecutedCall, MockConnector, MockDatabaseClient, MockStats};
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{
    BindParams, ColumnInfo, ExecuteDefaults, ExecuteOptions, ObjectRow, OutFormat, QueryResult,
    Row, Rows, Value,
};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("Invalid backend: {s}. Expected: postgres or sqlite")
        })
    }
}

/// Opens a non-pooled session for the given configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(
    config: &ConnectionConfig,
    defaults: ExecuteDefaults,
) -> Result<Box<dyn DatabaseClient>> {
    match config.backend() {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config, defaults).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config, defaults).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for one database session.
///
/// All database operations are async and return Results with SelectError.
/// Calls after [`DatabaseClient::close`] fail with a connection error.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Returns the backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Executes a statement with explicit bind values and options.
    async fn execute(
        &mut self,
        sql: &str,
        binds: &BindParams,
        options: &ExecuteOptions,
    ) -> Result<QueryResult>;

    /// Runs a script of one or more statements, discarding any rows.
    async fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Closes the session.
    async fn close(&mut self) -> Result<()>;
}

/// Acquires database sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn acquire(&self, config: &ConnectionConfig) -> Result<ConnectionHandle>;
}

/// Connector backed by the real drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector {
    defaults: ExecuteDefaults,
}

impl DriverConnector {
    /// Creates a connector whose clients use the given execution defaults.
    pub fn new(defaults: ExecuteDefaults) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl Connector for DriverConnector {
    async fn acquire(&self, config: &ConnectionConfig) -> Result<ConnectionHandle> {
        let client = connect(config, self.defaults).await?;
        Ok(ConnectionHandle::new(client))
    }
}
