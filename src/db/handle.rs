//! Ownership wrapper for one acquired database session.

use super::{BindParams, DatabaseBackend, DatabaseClient, ExecuteOptions, QueryResult};
use crate::error::Result;
use tracing::{debug, warn};

/// A live session that must be released exactly once.
///
/// [`ConnectionHandle::release`] consumes the handle, so a released session
/// cannot be used again.
pub struct ConnectionHandle {
    client: Box<dyn DatabaseClient>,
    released: bool,
}

impl ConnectionHandle {
    pub fn new(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            client,
            released: false,
        }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.client.backend()
    }

    /// Executes a statement on this session.
    pub async fn execute(
        &mut self,
        sql: &str,
        binds: &BindParams,
        options: &ExecuteOptions,
    ) -> Result<QueryResult> {
        self.client.execute(sql, binds, options).await
    }

    /// Runs a multi-statement script on this session.
    pub async fn execute_script(&mut self, script: &str) -> Result<()> {
        self.client.execute_script(script).await
    }

    /// Closes the session.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        debug!("Releasing {} connection", self.client.backend().as_str());
        self.client.close().await
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "{} connection dropped without being released",
                self.client.backend().as_str()
            );
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("backend", &self.client.backend())
            .field("released", &self.released)
            .finish()
    }
}
