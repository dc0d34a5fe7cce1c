use tracing::{info, warn};

use crate::config_store::ConfigStore;
use crate::connection_manager::{ConnectionManager, DatabaseBackend};
use crate::explorer::SchemaExplorer;
use crate::query_view::QueryView;
use crate::sql_generator::preview_select_sql;

pub const INITIAL_STATUS: &str = "Ready";

/// Owns the connection and both views, and keeps the status line.
pub struct Workbench<B: DatabaseBackend> {
    manager: ConnectionManager<B>,
    config: ConfigStore,
    explorer: SchemaExplorer,
    query: QueryView,
    status: String,
}

impl<B: DatabaseBackend> Workbench<B> {
    #[must_use]
    pub fn new(backend: B, config: ConfigStore) -> Self {
        Self {
            manager: ConnectionManager::new(backend),
            config,
            explorer: SchemaExplorer::new(),
            query: QueryView::new(),
            status: INITIAL_STATUS.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    #[must_use]
    pub fn explorer(&self) -> &SchemaExplorer {
        &self.explorer
    }

    pub fn explorer_mut(&mut self) -> &mut SchemaExplorer {
        &mut self.explorer
    }

    #[must_use]
    pub fn query(&self) -> &QueryView {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryView {
        &mut self.query
    }

    /// Prefills the connection input from the config file, or from `override_string`
    /// when given. Returns whether an auto-connect should follow.
    pub fn load_initial_config(&mut self, override_string: Option<String>) -> bool {
        let connection_string = override_string
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.config.load());
        self.query.set_connection_string(connection_string);
        !self.query.connection_string().is_empty()
    }

    pub async fn connect(&mut self) {
        let connection_string = self.query.connection_string().to_string();
        if connection_string.is_empty() {
            self.status = "Please enter a connection string.".to_string();
            return;
        }

        self.status = "Connecting...".to_string();
        match self.manager.connect(&connection_string).await {
            Ok(()) => {
                if let Err(error) = self.config.save(&connection_string) {
                    warn!(%error, "failed to save config");
                }
                self.status = "Connected to database.".to_string();
                self.refresh_tables().await;
            }
            Err(error) => {
                warn!(%error, "connection failed");
                self.explorer.clear();
                self.query
                    .show_message(format!("Connection failed: {error}"));
                self.status = "Connection failed.".to_string();
            }
        }
    }

    pub async fn refresh_tables(&mut self) {
        self.status = self.explorer.refresh(&mut self.manager).await;
    }

    pub async fn expand_selected_table(&mut self) {
        if let Some(status) = self.explorer.expand_selected(&mut self.manager).await {
            self.status = status;
        }
    }

    pub async fn run_query(&mut self) {
        self.status = self.query.run(&mut self.manager).await;
    }

    /// Loads a `SELECT * ... LIMIT` preview of `table` into the editor and runs it.
    pub async fn preview_table(&mut self, table: &str) {
        self.query.set_query(preview_select_sql(table));
        self.run_query().await;
    }

    pub async fn preview_selected_table(&mut self) {
        let Some(table) = self.explorer.selected_table().map(str::to_string) else {
            self.status = "No table selected.".to_string();
            return;
        };
        self.preview_table(&table).await;
    }

    pub async fn close(&mut self) {
        self.manager.close().await;
        info!("workbench closed");
    }
}
