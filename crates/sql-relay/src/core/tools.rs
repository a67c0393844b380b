use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    core::{connection::Database, limits::Limit},
    error::{AppError, AppResult},
};

/// Every tool this service announces, in listing order.
pub const ALL_TOOLS: [ToolKind; 3] = [
    ToolKind::GetTrueTables,
    ToolKind::ExecuteSql,
    ToolKind::ExecuteSqlV2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    GetTrueTables,
    ExecuteSql,
    ExecuteSqlV2,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub endpoint: &'static str,
    pub method: &'static str,
    pub parameters: Value,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TOOLS.into_iter().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GetTrueTables => "get_true_tables",
            ToolKind::ExecuteSql => "execute_sql",
            ToolKind::ExecuteSqlV2 => "execute_sql_v2",
        }
    }

    pub fn metadata(self) -> ToolMetadata {
        match self {
            ToolKind::GetTrueTables => ToolMetadata {
                name: self.name(),
                description: "Get table names and descriptions from the database catalog.",
                kind: "sse",
                endpoint: "/api/get_true_tables",
                method: "GET",
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolKind::ExecuteSql => ToolMetadata {
                name: self.name(),
                description: "Execute a SQL statement as-is and return every row.",
                kind: "query",
                endpoint: "/api/sql/execute",
                method: "POST",
                parameters: json!({
                    "type": "object",
                    "properties": { "sql": { "type": "string" } },
                    "required": ["sql"]
                }),
            },
            ToolKind::ExecuteSqlV2 => ToolMetadata {
                name: self.name(),
                description: "Execute a SQL query returning at most `limit` rows (default 20, -1 for all) plus the total row count.",
                kind: "query",
                endpoint: "/api/sql/execute/v2",
                method: "POST",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sql": { "type": "string" },
                        "limit": { "type": "integer", "default": 20 }
                    },
                    "required": ["sql"]
                }),
            },
        }
    }

    pub async fn execute(self, db: &Database, arguments: &Value) -> AppResult<Value> {
        match self {
            ToolKind::GetTrueTables => Ok(serde_json::to_value(db.catalog().await?)?),
            ToolKind::ExecuteSql => {
                let sql = require_sql(arguments)?;
                Ok(serde_json::to_value(db.execute(sql).await?)?)
            }
            ToolKind::ExecuteSqlV2 => {
                let sql = require_sql(arguments)?;
                let limit = match arguments.get("limit") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_i64().ok_or_else(|| {
                        AppError::InvalidRequest("limit must be an integer".into())
                    })?),
                };
                Ok(serde_json::to_value(
                    db.execute_paged(sql, Limit::requested(limit)).await?,
                )?)
            }
        }
    }
}

pub fn require_sql(arguments: &Value) -> AppResult<String> {
    non_blank_sql(arguments.get("sql").and_then(|v| v.as_str()))
}

/// Rejects missing or blank SQL before anything reaches the database.
pub fn non_blank_sql(sql: Option<&str>) -> AppResult<String> {
    match sql {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(AppError::InvalidRequest("missing or invalid field: sql".into())),
    }
}
