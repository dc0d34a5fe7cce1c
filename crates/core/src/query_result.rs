pub const NULL_DISPLAY: &str = "NULL";

const TEXT_SEPARATOR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub values: Vec<String>,
}

impl QueryRow {
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Cells joined with tabs, as placed on the clipboard.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        self.values.join("\t")
    }
}

/// What a statement produced: a result set, or a count of affected rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<QueryRow>,
    },
    Affected {
        rows: u64,
    },
}

impl QueryOutcome {
    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        match self {
            Self::Rows { columns, .. } => Some(columns),
            Self::Affected { .. } => None,
        }
    }

    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::Rows { rows, .. } => {
                format!("Query executed successfully. {} rows returned.", rows.len())
            }
            Self::Affected { rows } => affected_message(*rows),
        }
    }
}

#[must_use]
pub fn affected_message(rows: u64) -> String {
    format!("Query OK, {rows} rows affected.")
}

/// Plain-text rendering of a result set: header, separator, one line per row.
#[must_use]
pub fn render_text(columns: &[String], rows: &[QueryRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(columns.join(" | "));
    lines.push("-".repeat(TEXT_SEPARATOR_WIDTH));
    lines.extend(rows.iter().map(|row| row.values.join(" | ")));
    lines.join("\n")
}

#[must_use]
pub fn rows_to_clipboard_text<'a>(rows: impl IntoIterator<Item = &'a QueryRow>) -> String {
    rows.into_iter()
        .map(QueryRow::to_tsv)
        .collect::<Vec<_>>()
        .join("\n")
}
