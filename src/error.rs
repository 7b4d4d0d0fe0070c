//! Error types for db-select.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for db-select operations.
#[derive(Error, Debug)]
pub enum SelectError {
    /// Database connection errors (host unreachable, auth failed, closed session, etc.)
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        /// Display-safe description of the target, without the password.
        target: Option<String>,
    },

    /// Query execution errors (syntax errors, unknown tables, bad binds, etc.)
    #[error("Query error: {message}")]
    Query {
        message: String,
        /// Statement that failed, when known.
        sql: Option<String>,
    },

    /// Configuration errors (invalid config file, bad connect string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failures writing results to the output channel.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SelectError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            target: None,
        }
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            sql: None,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Records the failing statement on a query error. Other errors are returned unchanged.
    pub fn with_sql(self, statement: &str) -> Self {
        match self {
            Self::Query { message, sql: None } => Self::Query {
                message,
                sql: Some(statement.to_string()),
            },
            other => other,
        }
    }

    /// Records the connection target on a connection error. Other errors are returned unchanged.
    pub fn with_target(self, description: impl Into<String>) -> Self {
        match self {
            Self::Connection {
                message,
                target: None,
            } => Self::Connection {
                message,
                target: Some(description.into()),
            },
            other => other,
        }
    }

    /// Statement attached to a query error.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }

    /// Target attached to a connection error.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Connection { target, .. } => target.as_deref(),
            _ => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection Error",
            Self::Query { .. } => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Output(_) => "Output Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using SelectError.
pub type Result<T> = std::result::Result<T, SelectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = SelectError::connection("Cannot connect to localhost:5432");
        assert_eq!(
            err.to_string(),
            "Connection error: Cannot connect to localhost:5432"
        );
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_query() {
        let err = SelectError::query("relation \"locations\" does not exist");
        assert_eq!(
            err.to_string(),
            "Query error: relation \"locations\" does not exist"
        );
        assert_eq!(err.category(), "Query Error");
    }

    #[test]
    fn test_query_error_carries_sql() {
        let err = SelectError::query("syntax error at or near \"FORM\"")
            .with_sql("SELECT city FORM locations");
        assert_eq!(err.sql(), Some("SELECT city FORM locations"));
        assert_eq!(
            err.to_string(),
            "Query error: syntax error at or near \"FORM\""
        );

        // The first statement recorded wins.
        let err = err.with_sql("SELECT 1");
        assert_eq!(err.sql(), Some("SELECT city FORM locations"));
    }

    #[test]
    fn test_connection_error_carries_target() {
        let err = SelectError::connection("Authentication failed for user 'hr'")
            .with_target("hr @ localhost/hr (postgres)");
        assert_eq!(err.target(), Some("hr @ localhost/hr (postgres)"));
        assert_eq!(err.sql(), None);
    }

    #[test]
    fn test_context_is_ignored_by_other_kinds() {
        let err = SelectError::config("bad").with_sql("SELECT 1").with_target("db");
        assert_eq!(err.sql(), None);
        assert_eq!(err.target(), None);
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_error_display_config() {
        let err = SelectError::config("missing connect_string in connections.default");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing connect_string in connections.default"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed");
        let err: SelectError = io.into();
        assert_eq!(err.to_string(), "Output error: stdout closed");
        assert_eq!(err.category(), "Output Error");
    }

    #[test]
    fn test_error_display_internal() {
        let err = SelectError::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
        assert_eq!(err.category(), "Internal Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SelectError>();
    }
}
