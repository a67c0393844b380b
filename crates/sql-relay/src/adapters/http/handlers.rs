use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    core::{
        limits::Limit,
        tools::non_blank_sql,
        types::{PagedResult, ResultSet},
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    #[serde(default)]
    pub sql: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SqlV2Request {
    #[serde(default)]
    pub sql: Option<String>,
    /// `-1` returns every row; absent or `null` means 20.
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub clients: usize,
}

pub async fn execute_sql(
    State(state): State<AppState>,
    payload: Result<Json<SqlRequest>, JsonRejection>,
) -> AppResult<Json<ResultSet>> {
    let Json(req) = payload.map_err(malformed)?;
    let sql = non_blank_sql(req.sql.as_deref())?;
    let rows = state.db.execute(sql).await?;
    Ok(Json(rows))
}

pub async fn execute_sql_v2(
    State(state): State<AppState>,
    payload: Result<Json<SqlV2Request>, JsonRejection>,
) -> AppResult<Json<PagedResult>> {
    let Json(req) = payload.map_err(malformed)?;
    let sql = non_blank_sql(req.sql.as_deref())?;
    let page = state
        .db
        .execute_paged(sql, Limit::requested(req.limit))
        .await?;
    Ok(Json(page))
}

pub async fn get_true_tables(State(state): State<AppState>) -> AppResult<Json<ResultSet>> {
    Ok(Json(state.db.catalog().await?))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        database: state.db.db_path.display().to_string(),
        clients: state.clients.len(),
    })
}

fn malformed(rejection: JsonRejection) -> AppError {
    AppError::InvalidRequest(rejection.body_text())
}
