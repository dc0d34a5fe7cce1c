use std::collections::BTreeSet;

use tracing::error;

use crate::connection_manager::{ConnectionManager, DatabaseBackend};
use crate::query_result::{render_text, rows_to_clipboard_text, QueryOutcome, QueryRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    Table,
    Text,
}

impl ResultTab {
    #[must_use]
    pub fn toggle(self) -> Self {
        match self {
            Self::Table => Self::Text,
            Self::Text => Self::Table,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Text => "Text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultGrid {
    pub columns: Vec<String>,
    pub rows: Vec<QueryRow>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryView {
    connection_input: String,
    query_text: String,
    grid: ResultGrid,
    text_output: String,
    active_tab: ResultTab,
    cursor: usize,
    selected_rows: BTreeSet<usize>,
    text_scroll: usize,
}

impl QueryView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection input with surrounding whitespace removed.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        self.connection_input.trim()
    }

    pub fn set_connection_string(&mut self, connection_string: impl Into<String>) {
        self.connection_input = connection_string.into();
    }

    pub fn connection_input_mut(&mut self) -> &mut String {
        &mut self.connection_input
    }

    #[must_use]
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query_text = query.into();
    }

    pub fn query_text_mut(&mut self) -> &mut String {
        &mut self.query_text
    }

    #[must_use]
    pub fn grid(&self) -> &ResultGrid {
        &self.grid
    }

    #[must_use]
    pub fn text_output(&self) -> &str {
        &self.text_output
    }

    #[must_use]
    pub fn active_tab(&self) -> ResultTab {
        self.active_tab
    }

    pub fn toggle_tab(&mut self) {
        self.active_tab = self.active_tab.toggle();
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First visible line of the Text tab.
    #[must_use]
    pub fn text_scroll(&self) -> usize {
        self.text_scroll
    }

    pub fn scroll_text_up(&mut self) {
        self.text_scroll = self.text_scroll.saturating_sub(1);
    }

    pub fn scroll_text_down(&mut self) {
        let last_line = self.text_output.lines().count().saturating_sub(1);
        self.text_scroll = (self.text_scroll + 1).min(last_line);
    }

    #[must_use]
    pub fn is_row_selected(&self, index: usize) -> bool {
        self.selected_rows.contains(&index)
    }

    /// Runs the editor text verbatim and returns the status line.
    ///
    /// A failed statement is rolled back so the connection stays usable.
    pub async fn run<B: DatabaseBackend>(&mut self, manager: &mut ConnectionManager<B>) -> String {
        let query = self.query_text.trim().to_string();
        if query.is_empty() {
            return "Query is empty.".to_string();
        }

        match manager.execute(&query).await {
            Ok(outcome) => self.show_outcome(outcome),
            Err(err) => {
                manager.rollback().await;
                error!(error = %err, "query failed");
                self.show_message(format!("SQL Error: {err}"));
                "Query failed.".to_string()
            }
        }
    }

    /// Replaces the result area with `outcome` and returns the status line.
    pub fn show_outcome(&mut self, outcome: QueryOutcome) -> String {
        let status = outcome.status_message();
        match outcome {
            QueryOutcome::Rows { columns, rows } => {
                self.text_output = render_text(&columns, &rows);
                self.grid = ResultGrid { columns, rows };
                self.reset_selection();
                self.active_tab = ResultTab::Table;
            }
            QueryOutcome::Affected { .. } => self.show_message(status.clone()),
        }
        status
    }

    /// Clears the grid and shows `message` on the Text tab.
    pub fn show_message(&mut self, message: impl Into<String>) {
        self.grid = ResultGrid::default();
        self.reset_selection();
        self.text_output = message.into();
        self.active_tab = ResultTab::Text;
    }

    pub fn move_cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_down(&mut self) {
        let row_count = self.grid.rows.len();
        if row_count > 0 {
            self.cursor = (self.cursor + 1).min(row_count - 1);
        }
    }

    pub fn toggle_row_selection(&mut self) {
        if self.cursor >= self.grid.rows.len() {
            return;
        }
        if !self.selected_rows.remove(&self.cursor) {
            self.selected_rows.insert(self.cursor);
        }
    }

    /// Tab-separated text for the selected rows (or the cursor row when none
    /// are selected), with the number of rows it covers.
    #[must_use]
    pub fn copy_text(&self) -> Option<(String, usize)> {
        if self.grid.rows.is_empty() {
            return None;
        }

        let rows = if self.selected_rows.is_empty() {
            vec![self.grid.rows.get(self.cursor)?]
        } else {
            self.selected_rows
                .iter()
                .filter_map(|index| self.grid.rows.get(*index))
                .collect::<Vec<_>>()
        };
        let count = rows.len();
        Some((rows_to_clipboard_text(rows), count))
    }

    fn reset_selection(&mut self) {
        self.cursor = 0;
        self.selected_rows.clear();
        self.text_scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryView, ResultTab};
    use crate::connection_manager::ConnectionManager;
    use crate::query_result::{QueryOutcome, QueryRow};
    use crate::test_support::{FakeBackend, VALID_CONNECTION_STRING};

    fn row(values: &[&str]) -> QueryRow {
        QueryRow::new(values.iter().map(|value| (*value).to_string()).collect())
    }

    fn users_outcome() -> QueryOutcome {
        QueryOutcome::Rows {
            columns: vec!["id".to_string(), "email".to_string()],
            rows: vec![
                row(&["1", "a@example.com"]),
                row(&["2", "b@example.com"]),
                row(&["3", "NULL"]),
            ],
        }
    }

    async fn connected(backend: FakeBackend) -> ConnectionManager<FakeBackend> {
        let mut manager = ConnectionManager::new(backend);
        manager
            .connect(VALID_CONNECTION_STRING)
            .await
            .expect("connect should succeed");
        manager
    }

    #[tokio::test]
    async fn empty_query_does_not_touch_backend() {
        let backend = FakeBackend::with_sample_schema();
        let mut manager = connected(backend.clone()).await;
        let mut view = QueryView::new();
        view.set_query("   \n ");

        assert_eq!(view.run(&mut manager).await, "Query is empty.");
        assert!(backend.executed().is_empty());
    }

    #[tokio::test]
    async fn select_fills_grid_and_text_view() {
        let backend = FakeBackend::with_sample_schema();
        backend.respond("SELECT id, email FROM users", users_outcome());
        let mut manager = connected(backend.clone()).await;
        let mut view = QueryView::new();
        view.set_query("  SELECT id, email FROM users\n");

        let status = view.run(&mut manager).await;
        assert_eq!(status, "Query executed successfully. 3 rows returned.");
        assert_eq!(backend.executed(), vec!["SELECT id, email FROM users".to_string()]);
        assert_eq!(view.grid().columns.len(), 2);
        assert_eq!(view.grid().rows.len(), 3);
        assert_eq!(view.active_tab(), ResultTab::Table);
        assert!(view.text_output().starts_with("id | email\n"));
    }

    #[tokio::test]
    async fn non_select_clears_grid_and_shows_message() {
        let backend = FakeBackend::with_sample_schema();
        backend.respond("SELECT id, email FROM users", users_outcome());
        backend.respond("UPDATE users SET nickname = 'x'", QueryOutcome::Affected { rows: 3 });
        let mut manager = connected(backend).await;
        let mut view = QueryView::new();
        view.set_query("SELECT id, email FROM users");
        view.run(&mut manager).await;

        view.set_query("UPDATE users SET nickname = 'x'");
        let status = view.run(&mut manager).await;
        assert_eq!(status, "Query OK, 3 rows affected.");
        assert!(view.grid().columns.is_empty());
        assert!(view.grid().rows.is_empty());
        assert_eq!(view.text_output(), "Query OK, 3 rows affected.");
        assert_eq!(view.active_tab(), ResultTab::Text);
    }

    #[tokio::test]
    async fn failure_rolls_back_and_shows_error_text() {
        let backend = FakeBackend::with_sample_schema();
        backend.fail("DROP TABLE nope", "table \"nope\" does not exist");
        backend.respond("SELECT id, email FROM users", users_outcome());
        let mut manager = connected(backend.clone()).await;
        let mut view = QueryView::new();

        view.set_query("DROP TABLE nope");
        assert_eq!(view.run(&mut manager).await, "Query failed.");
        assert_eq!(
            view.text_output(),
            "SQL Error: table \"nope\" does not exist"
        );
        assert_eq!(view.active_tab(), ResultTab::Text);
        assert_eq!(backend.rollback_calls(), 1);

        view.set_query("SELECT id, email FROM users");
        assert_eq!(
            view.run(&mut manager).await,
            "Query executed successfully. 3 rows returned."
        );
    }

    #[tokio::test]
    async fn running_while_disconnected_reports_not_connected() {
        let mut manager = ConnectionManager::new(FakeBackend::with_sample_schema());
        let mut view = QueryView::new();
        view.set_query("SELECT 1");

        assert_eq!(view.run(&mut manager).await, "Query failed.");
        assert_eq!(view.text_output(), "SQL Error: Not connected to database.");
    }

    #[test]
    fn copy_uses_cursor_row_without_selection() {
        let mut view = QueryView::new();
        view.show_outcome(users_outcome());
        view.move_cursor_down();

        assert_eq!(
            view.copy_text(),
            Some(("2\tb@example.com".to_string(), 1))
        );
    }

    #[test]
    fn copy_joins_selected_rows_in_grid_order() {
        let mut view = QueryView::new();
        view.show_outcome(users_outcome());
        view.move_cursor_down();
        view.move_cursor_down();
        view.toggle_row_selection();
        view.move_cursor_up();
        view.move_cursor_up();
        view.toggle_row_selection();

        assert!(view.is_row_selected(0));
        assert!(view.is_row_selected(2));
        assert_eq!(
            view.copy_text(),
            Some(("1\ta@example.com\n3\tNULL".to_string(), 2))
        );
    }

    #[test]
    fn copy_without_rows_is_none() {
        let mut view = QueryView::new();
        view.show_message("Query OK, 0 rows affected.");
        assert!(view.copy_text().is_none());
    }

    #[test]
    fn cursor_stays_within_grid() {
        let mut view = QueryView::new();
        view.show_outcome(users_outcome());
        for _ in 0..10 {
            view.move_cursor_down();
        }
        assert_eq!(view.cursor(), 2);
        view.move_cursor_up();
        assert_eq!(view.cursor(), 1);
    }

    #[test]
    fn text_scroll_stays_within_output_and_resets_on_new_result() {
        let mut view = QueryView::new();
        view.show_outcome(users_outcome());
        let line_count = view.text_output().lines().count();
        assert_eq!(line_count, 5);

        for _ in 0..20 {
            view.scroll_text_down();
        }
        assert_eq!(view.text_scroll(), line_count - 1);
        view.scroll_text_up();
        assert_eq!(view.text_scroll(), line_count - 2);

        view.show_message("Query OK, 1 rows affected.");
        assert_eq!(view.text_scroll(), 0);
        view.scroll_text_down();
        assert_eq!(view.text_scroll(), 0);
    }

    #[test]
    fn connection_string_is_trimmed() {
        let mut view = QueryView::new();
        view.set_connection_string("  host=localhost  ");
        assert_eq!(view.connection_string(), "host=localhost");
    }
}
