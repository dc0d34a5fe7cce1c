use std::collections::BTreeSet;

use async_trait::async_trait;
use bayanat_core::connection_manager::{BackendError, DatabaseBackend};
use bayanat_core::query_result::{QueryOutcome, QueryRow, NULL_DISPLAY};
use bayanat_core::schema::{ColumnInfo, TableColumns};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Row, SimpleQueryMessage, SimpleQueryRow};
use tracing::{debug, warn};

const LIST_TABLES_SQL: &str = "SELECT table_name::text \
     FROM information_schema.tables \
     WHERE table_schema = 'public' \
     ORDER BY table_name";

const LIST_COLUMNS_SQL: &str = "SELECT column_name::text, data_type::text, \
     is_nullable::text, column_default::text \
     FROM information_schema.columns \
     WHERE table_name::text = $1 AND table_schema = 'public' \
     ORDER BY ordinal_position";

const PRIMARY_KEYS_SQL: &str = "SELECT c.column_name::text \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.constraint_column_usage AS ccu \
       USING (constraint_schema, constraint_name) \
     JOIN information_schema.columns AS c \
       ON c.table_schema = tc.constraint_schema \
      AND tc.table_name = c.table_name \
      AND ccu.column_name = c.column_name \
     WHERE tc.constraint_type = 'PRIMARY KEY' \
       AND tc.table_name::text = $1 \
       AND tc.table_schema = 'public'";

/// Open client plus the task driving its socket.
pub struct PostgresConnection {
    client: Client,
    driver: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend;

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    type Connection = PostgresConnection;

    async fn connect(&self, connection_string: &str) -> Result<Self::Connection, BackendError> {
        let tls = tls_connector()?;
        let (client, connection) = tokio_postgres::connect(connection_string, tls)
            .await
            .map_err(to_backend_error)?;

        let driver = tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(error = %format_pg_error(&error), "postgres connection ended with error");
            }
        });

        Ok(PostgresConnection { client, driver })
    }

    async fn close(&self, connection: Self::Connection) -> Result<(), BackendError> {
        let PostgresConnection { client, driver } = connection;
        drop(client);
        driver
            .await
            .map_err(|error| BackendError::new(error.to_string()))
    }

    fn is_closed(&self, connection: &Self::Connection) -> bool {
        connection.client.is_closed()
    }

    async fn list_tables(
        &self,
        connection: &mut Self::Connection,
    ) -> Result<Vec<String>, BackendError> {
        let rows = connection
            .client
            .query(LIST_TABLES_SQL, &[])
            .await
            .map_err(to_backend_error)?;
        rows.iter().map(|row| text_column(row, 0)).collect()
    }

    async fn list_columns(
        &self,
        connection: &mut Self::Connection,
        table: &str,
    ) -> Result<TableColumns, BackendError> {
        let column_rows = connection
            .client
            .query(LIST_COLUMNS_SQL, &[&table])
            .await
            .map_err(to_backend_error)?;
        let columns = column_rows
            .iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: text_column(row, 0)?,
                    data_type: text_column(row, 1)?,
                    is_nullable: text_column(row, 2)?,
                    default_value: row
                        .try_get::<_, Option<String>>(3)
                        .map_err(to_backend_error)?,
                })
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        let key_rows = connection
            .client
            .query(PRIMARY_KEYS_SQL, &[&table])
            .await
            .map_err(to_backend_error)?;
        let primary_keys = key_rows
            .iter()
            .map(|row| text_column(row, 0))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(TableColumns {
            columns,
            primary_keys,
        })
    }

    async fn execute(
        &self,
        connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<QueryOutcome, BackendError> {
        let client = &connection.client;
        client
            .batch_execute("BEGIN")
            .await
            .map_err(to_backend_error)?;
        let messages = client.simple_query(sql).await.map_err(to_backend_error)?;
        client
            .batch_execute("COMMIT")
            .await
            .map_err(to_backend_error)?;

        let outcome = collect_outcome(messages);
        debug!(kind = outcome_kind(&outcome), "statement executed");
        Ok(outcome)
    }

    async fn rollback(&self, connection: &mut Self::Connection) -> Result<(), BackendError> {
        connection
            .client
            .batch_execute("ROLLBACK")
            .await
            .map_err(to_backend_error)
    }
}

/// TLS used for `sslmode=prefer` and `sslmode=require`; `sslmode=disable`
/// never starts a handshake.
///
/// Server certificates and host names are not verified, the same as libpq
/// in those two modes.
fn tls_connector() -> Result<MakeTlsConnector, BackendError> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|error| BackendError::new(format!("failed to set up TLS: {error}")))?;
    Ok(MakeTlsConnector::new(connector))
}

/// Folds simple-protocol messages into the outcome of the last statement.
fn collect_outcome(messages: Vec<SimpleQueryMessage>) -> QueryOutcome {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut last = None;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) => {
                columns = Some(
                    description
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect(),
                );
                rows.clear();
            }
            SimpleQueryMessage::Row(row) => {
                if columns.is_none() {
                    columns = Some(
                        row.columns()
                            .iter()
                            .map(|column| column.name().to_string())
                            .collect(),
                    );
                }
                rows.push(simple_row_to_query_row(&row));
            }
            SimpleQueryMessage::CommandComplete(count) => {
                last = Some(match columns.take() {
                    Some(columns) => QueryOutcome::Rows {
                        columns,
                        rows: std::mem::take(&mut rows),
                    },
                    None => QueryOutcome::Affected { rows: count },
                });
            }
            _ => {}
        }
    }

    last.unwrap_or(QueryOutcome::Affected { rows: 0 })
}

fn outcome_kind(outcome: &QueryOutcome) -> &'static str {
    match outcome {
        QueryOutcome::Rows { .. } => "rows",
        QueryOutcome::Affected { .. } => "affected",
    }
}

fn simple_row_to_query_row(row: &SimpleQueryRow) -> QueryRow {
    let values = (0..row.len())
        .map(|index| format_cell(row.get(index)))
        .collect::<Vec<_>>();
    QueryRow::new(values)
}

fn format_cell(value: Option<&str>) -> String {
    value.unwrap_or(NULL_DISPLAY).to_string()
}

fn text_column(row: &Row, index: usize) -> Result<String, BackendError> {
    row.try_get::<_, String>(index).map_err(to_backend_error)
}

/// Server errors read as `SEVERITY: message`, followed by detail and hint
/// lines when the server sent them.
fn format_pg_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = format!("{}: {}", db_error.severity(), db_error.message());
    if let Some(detail) = db_error.detail() {
        message.push_str("\nDETAIL: ");
        message.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        message.push_str("\nHINT: ");
        message.push_str(hint);
    }
    message
}

fn to_backend_error(error: tokio_postgres::Error) -> BackendError {
    BackendError::new(format_pg_error(&error))
}
