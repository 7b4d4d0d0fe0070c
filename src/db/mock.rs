//! Mock database client for testing.
//!
//! Provides an in-memory client that returns a fixed result set and counts
//! every call, plus a connector that hands out such clients.

use super::{
    BindParams, ColumnInfo, ConnectionHandle, Connector, DatabaseBackend, DatabaseClient,
    ExecuteDefaults, ExecuteOptions, QueryResult, Row, Value,
};
use crate::config::ConnectionConfig;
use crate::error::{Result, SelectError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCall {
    pub sql: String,
    pub binds: BindParams,
    pub options: ExecuteOptions,
}

/// Call counters shared between a mock client, its clones and its connector.
#[derive(Debug, Default)]
pub struct MockStats {
    acquire_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    script_calls: AtomicUsize,
    close_calls: AtomicUsize,
    executed: Mutex<Vec<ExecutedCall>>,
}

impl MockStats {
    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn script_calls(&self) -> usize {
        self.script_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Returns every recorded `execute` call, in order.
    pub fn executed(&self) -> Vec<ExecutedCall> {
        self.executed
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

/// A mock database client that returns predefined results.
#[derive(Debug, Clone)]
pub struct MockDatabaseClient {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    defaults: ExecuteDefaults,
    fail_execute_at: Option<usize>,
    fail_close: bool,
    closed: bool,
    stats: Arc<MockStats>,
}

impl MockDatabaseClient {
    /// Creates a mock client holding the cities that start with `S`, ordered by city.
    pub fn new() -> Self {
        Self {
            columns: vec![
                ColumnInfo::new("location_id", "INTEGER"),
                ColumnInfo::new("city", "TEXT"),
            ],
            rows: vec![
                vec![Value::Int(1400), Value::from("Seattle")],
                vec![Value::Int(1700), Value::from("South San Francisco")],
                vec![Value::Int(1000), Value::from("Southlake")],
            ],
            defaults: ExecuteDefaults::default(),
            fail_execute_at: None,
            fail_close: false,
            closed: false,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Replaces the result set returned by every execution.
    pub fn with_result(mut self, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    pub fn with_defaults(mut self, defaults: ExecuteDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Makes the `call`-th execution (1-based) fail with a query error.
    pub fn failing_execute_at(mut self, call: usize) -> Self {
        self.fail_execute_at = Some(call);
        self
    }

    /// Makes `close` fail with a connection error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Returns the shared call counters.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SelectError::connection("Connection is closed"));
        }
        Ok(())
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute(
        &mut self,
        sql: &str,
        binds: &BindParams,
        options: &ExecuteOptions,
    ) -> Result<QueryResult> {
        self.ensure_open()?;
        let call = self.stats.execute_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut executed) = self.stats.executed.lock() {
            executed.push(ExecutedCall {
                sql: sql.to_string(),
                binds: binds.clone(),
                options: *options,
            });
        }

        if self.fail_execute_at == Some(call) {
            return Err(SelectError::query(format!(
                "mock failure on execution {call}"
            )));
        }

        let format = options.effective_format(&self.defaults);
        let mut rows = self.rows.clone();
        let limit = options.effective_limit(&self.defaults);
        let truncated = limit.is_some_and(|limit| rows.len() > limit);
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        let result = QueryResult::from_rows(self.columns.clone(), rows, format)
            .with_execution_time(Duration::from_millis(1));
        Ok(if truncated { result.truncated() } else { result })
    }

    async fn execute_script(&mut self, _script: &str) -> Result<()> {
        self.ensure_open()?;
        self.stats.script_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        if self.fail_close {
            return Err(SelectError::connection("mock failure while closing"));
        }
        Ok(())
    }
}

/// A connector that hands out clones of a mock client, or always fails.
#[derive(Debug, Clone)]
pub struct MockConnector {
    client: Option<MockDatabaseClient>,
    stats: Arc<MockStats>,
}

impl MockConnector {
    /// Creates a connector that returns clones of `client`.
    pub fn new(client: MockDatabaseClient) -> Self {
        let stats = client.stats();
        Self {
            client: Some(client),
            stats,
        }
    }

    /// Creates a connector whose every acquisition fails.
    pub fn failing() -> Self {
        Self {
            client: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn acquire(&self, config: &ConnectionConfig) -> Result<ConnectionHandle> {
        self.stats.acquire_calls.fetch_add(1, Ordering::SeqCst);
        match &self.client {
            Some(client) => Ok(ConnectionHandle::new(Box::new(client.clone()))),
            None => Err(SelectError::connection(format!(
                "Cannot connect to {}",
                config.display_string()
            ))),
        }
    }
}
