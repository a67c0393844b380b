use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to open database: {path}: {message}")]
    DbOpenFailed { path: PathBuf, message: String },

    #[error("sql error: {0}")]
    SqlError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::SqlError(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::SqlError(_) => "SQL_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Malformed requests are the caller's fault; everything else is a server error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::InvalidRequest(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
