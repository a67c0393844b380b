use rusqlite::Connection;

use crate::core::{query, types::ResultSet};
use crate::error::{AppError, AppResult};

/// Table names and their descriptions, as produced by the configured catalog query.
pub fn list_catalog(conn: &Connection, catalog_query: &str) -> AppResult<ResultSet> {
    if catalog_query.trim().is_empty() {
        return Err(AppError::Internal("catalog query is not configured".into()));
    }
    query::execute(conn, catalog_query)
}
