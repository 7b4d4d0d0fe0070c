//! db-select - Runs a SQL query and prints its rows as arrays and as objects.

mod cli;

use cli::Cli;
use db_select::config::{Config, ConnectionConfig};
use db_select::db::DriverConnector;
use db_select::error::{Result, SelectError};
use db_select::logging;
use db_select::output::ResultPrinter;
use db_select::runner::QueryRunner;
use tracing::{debug, error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let dotenv = dotenvy::dotenv();
    logging::init_stderr_logging();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => error!("Failed to load .env file: {e}"),
    }

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the run completed without errors.
async fn run() -> Result<bool> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration file
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = resolve_connection(&cli, &config)?;
    let defaults = cli.execute_defaults(config.defaults);

    let mut runner = QueryRunner::new(DriverConnector::new(defaults), connection)
        .with_statement(cli.statement())
        .with_printer(ResultPrinter::new(cli.output));

    if let Some(path) = &cli.seed {
        let seed = std::fs::read_to_string(path).map_err(|e| {
            SelectError::config(format!("Failed to read seed file {}: {e}", path.display()))
        })?;
        runner = runner.with_seed(seed);
    }

    let mut stdout = std::io::stdout();
    let report = runner.run(&mut stdout).await;
    Ok(report.succeeded())
}

/// Resolves the final connection configuration from the config file and CLI args.
///
/// Precedence: CLI arguments (and their environment variables), then the
/// named connection, then the `default` connection.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    let mut connection = match cli.connection_name() {
        Some(name) => config.get_connection(Some(name)).cloned().ok_or_else(|| {
            SelectError::config(format!("Connection '{}' not found in config file", name))
        })?,
        None => config.get_connection(None).cloned().unwrap_or_default(),
    };

    connection.merge(&cli.to_connection_config()?);

    if connection.connect_string.is_none() {
        return Err(SelectError::config(
            "No database connection configured. Use --help for usage information.",
        ));
    }

    Ok(connection)
}
