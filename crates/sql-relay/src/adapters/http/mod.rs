//! HTTP surface: SQL pass-through endpoints, the catalog tool, and the
//! push-style tool listing.

mod clients;
mod events;
mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cli::Args,
    core::connection::Database,
    error::{AppError, AppResult},
};

pub use clients::ClientRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub clients: ClientRegistry,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            clients: ClientRegistry::new(),
        }
    }
}

pub async fn serve(args: Args) -> AppResult<()> {
    let db = Database::open(&args.db, args.busy_timeout_ms)?
        .with_catalog_query(args.catalog_query.clone());
    let app = router(AppState::new(db));

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(addr = %args.listen, db = %args.db.display(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/sql/execute", post(handlers::execute_sql))
        .route("/sql/execute/v2", post(handlers::execute_sql_v2))
        .route("/get_true_tables", get(handlers::get_true_tables))
        .route("/mcp/tools", get(events::list_tools))
        .route("/health", get(handlers::health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
