//! Logging configuration for db-select.
//!
//! Result rows go to stdout, so all diagnostics are written to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr.
///
/// The filter is read from `RUST_LOG`, falling back to `info`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), "info");
    }
}
