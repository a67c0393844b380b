use serde::Serialize;

/// One result row. Keys keep the column order the database reported.
pub type DbRow = serde_json::Map<String, serde_json::Value>;

pub type ResultSet = Vec<DbRow>;

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub decl_type: Option<String>,
}

/// Rows returned under a limit, plus the row count of the unlimited statement.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult {
    pub data: ResultSet,
    pub total: i64,
}
