//! The connect, execute, format workflow.
//!
//! [`QueryRunner::run`] acquires one connection, executes the statement once
//! with the client's default row format and once with object rows, prints
//! both result sets and releases the connection on every path.

use crate::config::ConnectionConfig;
use crate::db::{
    BindParams, ConnectionHandle, Connector, ExecuteOptions, OutFormat, QueryResult,
};
use crate::error::{Result, SelectError};
use crate::output::{self, ResultPrinter};
use std::io::Write;
use tracing::{debug, error, info};

/// Statement executed when none is given.
pub const CITIES_SQL: &str = "SELECT location_id, city
     FROM locations
     WHERE city LIKE 'S%'
     ORDER BY city";

/// Label title for [`CITIES_SQL`].
pub const CITIES_TITLE: &str = "Cities beginning with 'S'";

/// Title used for custom statements without an explicit title.
pub const CUSTOM_TITLE: &str = "Query results";

/// The statement a runner executes, with its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: BindParams,
    pub title: String,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: BindParams::none(),
            title: CUSTOM_TITLE.to_string(),
        }
    }

    pub fn with_binds(mut self, binds: BindParams) -> Self {
        self.binds = binds;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Default for Statement {
    fn default() -> Self {
        Self::new(CITIES_SQL).with_title(CITIES_TITLE)
    }
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Connected,
    QueriedDefault,
    QueriedObject,
    Closed,
    Error,
}

/// What happened during a run.
#[derive(Debug)]
pub struct RunReport {
    /// Last state reached.
    pub state: RunState,
    /// Result of the default-format execution, if it succeeded.
    pub default_result: Option<QueryResult>,
    /// Result of the object-format execution, if it succeeded.
    pub object_result: Option<QueryResult>,
    /// First failure from acquire, seed, execute or print.
    pub error: Option<SelectError>,
    /// Failure while releasing the connection.
    pub release_error: Option<SelectError>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            state: RunState::Init,
            default_result: None,
            object_result: None,
            error: None,
            release_error: None,
        }
    }

    /// Returns true if nothing failed, release included.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.release_error.is_none()
    }

    fn transition(&mut self, state: RunState) {
        debug!("Run state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

/// Runs one statement in both row formats over a single connection.
pub struct QueryRunner<C: Connector> {
    connector: C,
    config: ConnectionConfig,
    statement: Statement,
    seed: Option<String>,
    printer: ResultPrinter,
}

impl<C: Connector> QueryRunner<C> {
    pub fn new(connector: C, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            statement: Statement::default(),
            seed: None,
            printer: ResultPrinter::default(),
        }
    }

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statement = statement;
        self
    }

    /// Sets a script executed on the fresh connection before querying.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_printer(mut self, printer: ResultPrinter) -> Self {
        self.printer = printer;
        self
    }

    /// Executes the workflow, writing result sets to `out`.
    ///
    /// Never fails: errors are logged and recorded in the returned report.
    pub async fn run<W: Write + ?Sized>(&self, out: &mut W) -> RunReport {
        let mut report = RunReport::new();

        info!("Connecting to {}", self.config.display_string());
        let mut handle = match self.connector.acquire(&self.config).await {
            Ok(handle) => handle,
            Err(e) => {
                let e = e.with_target(self.config.display_string());
                error!("{}: {}", e.category(), e);
                report.error = Some(e);
                report.transition(RunState::Error);
                return report;
            }
        };
        report.transition(RunState::Connected);

        if let Err(e) = self.query_both(&mut handle, out, &mut report).await {
            error!("{}: {}", e.category(), e);
            if let Some(sql) = e.sql() {
                debug!("Failed statement: {sql}");
            }
            report.error = Some(e);
            report.transition(RunState::Error);
        }

        if let Err(e) = handle.release().await {
            error!("Failed to release connection: {}: {}", e.category(), e);
            report.release_error = Some(e);
        }
        report.transition(RunState::Closed);

        report
    }

    async fn query_both<W: Write + ?Sized>(
        &self,
        handle: &mut ConnectionHandle,
        out: &mut W,
        report: &mut RunReport,
    ) -> Result<()> {
        if let Some(seed) = &self.seed {
            debug!("Running seed script ({} bytes)", seed.len());
            handle
                .execute_script(seed)
                .await
                .map_err(|e| e.with_sql(seed))?;
        }

        let statement = &self.statement;

        // Client default format.
        let result = handle
            .execute(&statement.sql, &statement.binds, &ExecuteOptions::new())
            .await
            .map_err(|e| e.with_sql(&statement.sql))?;
        let label = output::label(&statement.title, result.out_format(), true);
        self.printer.print(out, &label, &result)?;
        info!("Fetched {} rows in {:?}", result.row_count, result.execution_time);
        report.default_result = Some(result);
        report.transition(RunState::QueriedDefault);

        // Binds go first, even when empty; options select object rows.
        let options = ExecuteOptions::new().out_format(OutFormat::Object);
        let result = handle
            .execute(&statement.sql, &statement.binds, &options)
            .await
            .map_err(|e| e.with_sql(&statement.sql))?;
        let label = output::label(&statement.title, result.out_format(), false);
        self.printer.print(out, &label, &result)?;
        info!("Fetched {} rows in {:?}", result.row_count, result.execution_time);
        report.object_result = Some(result);
        report.transition(RunState::QueriedObject);

        Ok(())
    }
}
