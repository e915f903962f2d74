pub mod handlers;
pub mod routes;
pub mod state;
pub mod static_files;

use crate::config::WebConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Full application router. Split out of run_server so tests can drive it
/// without binding a socket.
pub fn router(state: Arc<AppState>) -> axum::Router {
    routes::ui_routes()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_server(config: WebConfig, state: Arc<AppState>) -> Result<(), std::io::Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("listening on http://{}:{}", config.host, config.port);
    axum::serve(listener, app).await
}
