use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::query_result::QueryOutcome;
use crate::schema::TableColumns;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Driver seam for a single-connection SQL client.
///
/// Every method is one round of blocking work from the caller's point of view;
/// implementations must not retry or pool.
#[async_trait]
pub trait DatabaseBackend {
    type Connection: Send;

    async fn connect(&self, connection_string: &str) -> Result<Self::Connection, BackendError>;
    async fn close(&self, connection: Self::Connection) -> Result<(), BackendError>;
    fn is_closed(&self, connection: &Self::Connection) -> bool;

    async fn list_tables(
        &self,
        connection: &mut Self::Connection,
    ) -> Result<Vec<String>, BackendError>;
    async fn list_columns(
        &self,
        connection: &mut Self::Connection,
        table: &str,
    ) -> Result<TableColumns, BackendError>;

    /// Runs `sql` verbatim and commits when it succeeds.
    async fn execute(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<QueryOutcome, BackendError>;
    async fn rollback(&self, connection: &mut Self::Connection) -> Result<(), BackendError>;
}

#[derive(Debug, Error)]
pub enum ConnectionManagerError {
    #[error("Not connected to database.")]
    NotConnected,
    #[error("{0}")]
    Backend(#[source] BackendError),
}

#[derive(Debug)]
pub struct ConnectionManager<B: DatabaseBackend> {
    backend: B,
    active: Option<B::Connection>,
}

impl<B: DatabaseBackend> ConnectionManager<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|connection| !self.backend.is_closed(connection))
    }

    /// Opens a new connection, closing the current one first.
    ///
    /// On failure the manager stays disconnected.
    pub async fn connect(&mut self, connection_string: &str) -> Result<(), ConnectionManagerError> {
        self.close().await;

        let connection = self
            .backend
            .connect(connection_string)
            .await
            .map_err(ConnectionManagerError::Backend)?;
        self.active = Some(connection);
        info!("database connection opened");
        Ok(())
    }

    pub async fn close(&mut self) {
        let Some(connection) = self.active.take() else {
            return;
        };
        if self.backend.is_closed(&connection) {
            return;
        }

        match self.backend.close(connection).await {
            Ok(()) => info!("database connection closed"),
            Err(error) => warn!(%error, "closing database connection failed"),
        }
    }

    /// Table names of the default schema in alphabetical order; empty when
    /// disconnected.
    pub async fn fetch_tables(&mut self) -> Result<Vec<String>, ConnectionManagerError> {
        let (backend, Some(connection)) = self.live_connection() else {
            return Ok(Vec::new());
        };

        let tables = backend
            .list_tables(connection)
            .await
            .map_err(ConnectionManagerError::Backend)?;
        debug!(count = tables.len(), "fetched table list");
        Ok(tables)
    }

    /// Column rows and primary-key names for `table`; both empty when
    /// disconnected.
    pub async fn fetch_columns(
        &mut self,
        table: &str,
    ) -> Result<TableColumns, ConnectionManagerError> {
        let (backend, Some(connection)) = self.live_connection() else {
            return Ok(TableColumns::default());
        };

        let columns = backend
            .list_columns(connection, table)
            .await
            .map_err(ConnectionManagerError::Backend)?;
        debug!(table, count = columns.columns.len(), "fetched column metadata");
        Ok(columns)
    }

    pub async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, ConnectionManagerError> {
        let (backend, connection) = self.live_connection();
        let connection = connection.ok_or(ConnectionManagerError::NotConnected)?;

        backend
            .execute(connection, sql)
            .await
            .map_err(ConnectionManagerError::Backend)
    }

    pub async fn rollback(&mut self) {
        let (backend, Some(connection)) = self.live_connection() else {
            return;
        };

        if let Err(error) = backend.rollback(connection).await {
            warn!(%error, "rollback failed");
        }
    }

    fn live_connection(&mut self) -> (&B, Option<&mut B::Connection>) {
        let backend = &self.backend;
        let connection = self
            .active
            .as_mut()
            .filter(|connection| !backend.is_closed(connection));
        (backend, connection)
    }
}
