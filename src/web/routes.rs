use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - web interface
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/diagram", get(handlers::ui::diagram_handler))
        .route("/static/{*path}", get(static_handler))
}

// API Routes - the three conversion/execution endpoints plus introspection
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            .route("/nl-to-sql", post(handlers::api::nl_to_sql))
            .route(
                "/er-to-sql",
                // Diagram uploads can exceed axum's 2 MB default.
                post(handlers::api::er_to_sql).layer(DefaultBodyLimit::max(16 * 1024 * 1024)),
            )
            .route("/execute-sql", post(handlers::api::execute_sql))
            .route("/schema", get(handlers::api::get_schema))
            .route("/status", get(handlers::api::system_status)),
    )
}
