use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::connection_manager::{BackendError, DatabaseBackend};
use crate::query_result::QueryOutcome;
use crate::schema::{ColumnInfo, TableColumns};

pub const VALID_CONNECTION_STRING: &str = "postgres://tester@localhost/app";
pub const INVALID_CONNECTION_STRING: &str = "not a connection string";

#[derive(Debug, Default)]
struct FakeState {
    tables: BTreeMap<String, TableColumns>,
    responses: HashMap<String, Result<QueryOutcome, String>>,
    fail_catalog: Option<String>,
    next_connection_id: u64,
    dropped_before: u64,
    in_failed_transaction: bool,
    executed: Vec<String>,
    column_fetches: Vec<String>,
    close_calls: usize,
    commit_calls: usize,
    rollback_calls: usize,
}

#[derive(Debug)]
pub struct FakeConnection {
    id: u64,
}

/// In-memory backend that mimics a server's transaction behaviour: a failed
/// statement poisons the transaction until a rollback arrives.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn with_sample_schema() -> Self {
        let backend = Self::default();
        backend.add_table(
            "users",
            TableColumns {
                columns: vec![
                    ColumnInfo::new("id", "integer", "NO", None),
                    ColumnInfo::new("email", "text", "NO", None),
                    ColumnInfo::new("nickname", "character varying", "YES", None),
                ],
                primary_keys: BTreeSet::from(["id".to_string()]),
            },
        );
        backend.add_table(
            "orders",
            TableColumns {
                columns: vec![
                    ColumnInfo::new("order_id", "bigint", "NO", None),
                    ColumnInfo::new("total", "numeric", "YES", Some("0".to_string())),
                ],
                primary_keys: BTreeSet::from(["order_id".to_string()]),
            },
        );
        backend
    }

    pub fn add_table(&self, name: &str, columns: TableColumns) {
        self.lock().tables.insert(name.to_string(), columns);
    }

    pub fn respond(&self, sql: &str, outcome: QueryOutcome) {
        self.lock().responses.insert(sql.to_string(), Ok(outcome));
    }

    pub fn fail(&self, sql: &str, message: &str) {
        self.lock()
            .responses
            .insert(sql.to_string(), Err(message.to_string()));
    }

    pub fn fail_catalog(&self, message: &str) {
        self.lock().fail_catalog = Some(message.to_string());
    }

    /// Simulates the server dropping every open connection.
    pub fn drop_connections(&self) {
        let mut state = self.lock();
        state.dropped_before = state.next_connection_id;
    }

    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn column_fetches(&self) -> Vec<String> {
        self.lock().column_fetches.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn commit_calls(&self) -> usize {
        self.lock().commit_calls
    }

    pub fn rollback_calls(&self) -> usize {
        self.lock().rollback_calls
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend state poisoned")
    }
}

#[async_trait]
impl DatabaseBackend for FakeBackend {
    type Connection = FakeConnection;

    async fn connect(&self, connection_string: &str) -> Result<Self::Connection, BackendError> {
        if connection_string == INVALID_CONNECTION_STRING {
            return Err(BackendError::new("invalid connection string"));
        }

        let mut state = self.lock();
        state.next_connection_id += 1;
        state.in_failed_transaction = false;
        Ok(FakeConnection {
            id: state.next_connection_id,
        })
    }

    async fn close(&self, _connection: Self::Connection) -> Result<(), BackendError> {
        self.lock().close_calls += 1;
        Ok(())
    }

    fn is_closed(&self, connection: &Self::Connection) -> bool {
        connection.id <= self.lock().dropped_before
    }

    async fn list_tables(
        &self,
        _connection: &mut Self::Connection,
    ) -> Result<Vec<String>, BackendError> {
        let state = self.lock();
        if let Some(message) = &state.fail_catalog {
            return Err(BackendError::new(message.clone()));
        }
        Ok(state.tables.keys().cloned().collect())
    }

    async fn list_columns(
        &self,
        _connection: &mut Self::Connection,
        table: &str,
    ) -> Result<TableColumns, BackendError> {
        let mut state = self.lock();
        state.column_fetches.push(table.to_string());
        if let Some(message) = &state.fail_catalog {
            return Err(BackendError::new(message.clone()));
        }
        Ok(state.tables.get(table).cloned().unwrap_or_default())
    }

    async fn execute(
        &self,
        _connection: &mut Self::Connection,
        sql: &str,
    ) -> Result<QueryOutcome, BackendError> {
        let mut state = self.lock();
        state.executed.push(sql.to_string());
        if state.in_failed_transaction {
            return Err(BackendError::new(
                "current transaction is aborted, commands ignored until end of transaction block",
            ));
        }

        match state.responses.get(sql).cloned() {
            Some(Ok(outcome)) => {
                state.commit_calls += 1;
                Ok(outcome)
            }
            Some(Err(message)) => {
                state.in_failed_transaction = true;
                Err(BackendError::new(message))
            }
            None => {
                state.commit_calls += 1;
                Ok(QueryOutcome::Affected { rows: 0 })
            }
        }
    }

    async fn rollback(&self, _connection: &mut Self::Connection) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.rollback_calls += 1;
        state.in_failed_transaction = false;
        Ok(())
    }
}
