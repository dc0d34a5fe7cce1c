pub const PREVIEW_LIMIT: usize = 50;

/// Wraps `identifier` in double quotes, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[must_use]
pub fn preview_select_sql(table: &str) -> String {
    format!(
        "SELECT * FROM {} LIMIT {PREVIEW_LIMIT};",
        quote_identifier(table)
    )
}
