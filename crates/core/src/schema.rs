use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// Catalog text as reported by `information_schema` (`YES` / `NO`).
    pub is_nullable: String,
    pub default_value: Option<String>,
}

impl ColumnInfo {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: impl Into<String>,
        default_value: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: is_nullable.into(),
            default_value,
        }
    }

    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.is_nullable == "NO"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableColumns {
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: BTreeSet<String>,
}

impl TableColumns {
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column_label(column, &self.primary_keys))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintTag {
    PrimaryKey,
    NotNull,
}

impl ConstraintTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryKey => "PK",
            Self::NotNull => "NN",
        }
    }
}

#[must_use]
pub fn constraint_tags(column: &ColumnInfo, primary_keys: &BTreeSet<String>) -> Vec<ConstraintTag> {
    let mut tags = Vec::with_capacity(2);
    if primary_keys.contains(&column.name) {
        tags.push(ConstraintTag::PrimaryKey);
    }
    if column.is_not_null() {
        tags.push(ConstraintTag::NotNull);
    }
    tags
}

/// Tree label for a column: ` name  :  TYPE [PK, NN]`.
#[must_use]
pub fn column_label(column: &ColumnInfo, primary_keys: &BTreeSet<String>) -> String {
    let tags = constraint_tags(column, primary_keys);
    let constraints = if tags.is_empty() {
        String::new()
    } else {
        let joined = tags
            .iter()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{joined}]")
    };

    format!(
        " {}  :  {} {constraints}",
        column.name,
        column.data_type.to_uppercase()
    )
}
