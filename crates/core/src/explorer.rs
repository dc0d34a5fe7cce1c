use tracing::error;

use crate::connection_manager::{ConnectionManager, DatabaseBackend};

pub const PLACEHOLDER_LABEL: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TableChildren {
    Placeholder,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableNode {
    name: String,
    expanded: bool,
    children: TableChildren,
}

impl TableNode {
    fn collapsed(name: String) -> Self {
        Self {
            name,
            expanded: false,
            children: TableChildren::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerRowKind {
    Table { expanded: bool },
    Column,
    Placeholder,
}

/// One visible line of the schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerRow {
    pub table_index: usize,
    pub kind: ExplorerRowKind,
    pub label: String,
}

/// Lazily populated table/column tree.
///
/// Tables carry a placeholder child until first expanded; columns are then
/// fetched once and kept until the next refresh.
#[derive(Debug, Clone, Default)]
pub struct SchemaExplorer {
    tables: Vec<TableNode>,
    cursor: usize,
}

impl SchemaExplorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Loaded column labels for `table`, `None` while the placeholder is still in place.
    #[must_use]
    pub fn column_labels(&self, table: &str) -> Option<&[String]> {
        self.tables
            .iter()
            .find(|node| node.name == table)
            .and_then(|node| match &node.children {
                TableChildren::Columns(labels) => Some(labels.as_slice()),
                TableChildren::Placeholder => None,
            })
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.cursor = 0;
    }

    /// Replaces the tree with the current table list and returns the status line.
    pub async fn refresh<B: DatabaseBackend>(&mut self, manager: &mut ConnectionManager<B>) -> String {
        self.clear();

        match manager.fetch_tables().await {
            Ok(tables) => {
                let count = tables.len();
                self.tables = tables.into_iter().map(TableNode::collapsed).collect();
                format!("Loaded {count} tables.")
            }
            Err(err) => {
                error!(error = %err, "refreshing tables failed");
                format!("Error loading tables: {err}")
            }
        }
    }

    #[must_use]
    pub fn visible_rows(&self) -> Vec<ExplorerRow> {
        let mut rows = Vec::with_capacity(self.tables.len());
        for (table_index, table) in self.tables.iter().enumerate() {
            rows.push(ExplorerRow {
                table_index,
                kind: ExplorerRowKind::Table {
                    expanded: table.expanded,
                },
                label: table.name.clone(),
            });
            if !table.expanded {
                continue;
            }

            match &table.children {
                TableChildren::Placeholder => rows.push(ExplorerRow {
                    table_index,
                    kind: ExplorerRowKind::Placeholder,
                    label: PLACEHOLDER_LABEL.to_string(),
                }),
                TableChildren::Columns(labels) => {
                    rows.extend(labels.iter().map(|label| ExplorerRow {
                        table_index,
                        kind: ExplorerRowKind::Column,
                        label: label.clone(),
                    }));
                }
            }
        }
        rows
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let row_count = self.visible_rows().len();
        if row_count > 0 {
            self.cursor = (self.cursor + 1).min(row_count - 1);
        }
    }

    /// Table owning the row under the cursor.
    #[must_use]
    pub fn selected_table(&self) -> Option<&str> {
        let index = self.selected_table_index()?;
        self.tables.get(index).map(|table| table.name.as_str())
    }

    #[must_use]
    pub fn selected_table_is_expanded(&self) -> bool {
        self.selected_table_index()
            .and_then(|index| self.tables.get(index))
            .is_some_and(|table| table.expanded)
    }

    /// Expands the selected table, fetching its columns on first expansion.
    ///
    /// Returns a status line only when fetching failed.
    pub async fn expand_selected<B: DatabaseBackend>(
        &mut self,
        manager: &mut ConnectionManager<B>,
    ) -> Option<String> {
        let index = self.selected_table_index()?;
        let table = self.tables.get_mut(index)?;
        table.expanded = true;
        if table.children != TableChildren::Placeholder {
            return None;
        }

        self.load_columns(index, manager).await
    }

    pub fn collapse_selected(&mut self) {
        let Some(index) = self.selected_table_index() else {
            return;
        };
        if let Some(table) = self.tables.get_mut(index) {
            table.expanded = false;
        }
        self.cursor = self.table_row(index);
    }

    async fn load_columns<B: DatabaseBackend>(
        &mut self,
        index: usize,
        manager: &mut ConnectionManager<B>,
    ) -> Option<String> {
        let table = self.tables.get_mut(index)?;
        table.children = TableChildren::Columns(Vec::new());

        match manager.fetch_columns(&table.name).await {
            Ok(columns) => {
                table.children = TableChildren::Columns(columns.labels());
                None
            }
            Err(err) => {
                error!(table = %table.name, error = %err, "loading columns failed");
                Some(format!("Error loading columns for {}", table.name))
            }
        }
    }

    fn selected_table_index(&self) -> Option<usize> {
        self.visible_rows()
            .get(self.cursor)
            .map(|row| row.table_index)
    }

    fn table_row(&self, table_index: usize) -> usize {
        self.visible_rows()
            .iter()
            .position(|row| {
                row.table_index == table_index && matches!(row.kind, ExplorerRowKind::Table { .. })
            })
            .unwrap_or(0)
    }
}
