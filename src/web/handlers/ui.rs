use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::context;
use std::sync::Arc;
use tracing::error;

use crate::exec::DbEngine;
use crate::web::state::AppState;

// Text description page
pub async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render_page(&state, "index.html", "describe")
}

// ER diagram upload page
pub async fn diagram_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render_page(&state, "diagram.html", "diagram")
}

fn render_page(state: &AppState, name: &str, active: &str) -> Response {
    let engines: Vec<&str> = DbEngine::ALL.iter().map(|e| e.dialect_name()).collect();
    let ctx = context! {
        version => env!("CARGO_PKG_VERSION"),
        engines => engines,
        active => active,
    };

    match state
        .template_env
        .get_template(name)
        .and_then(|tmpl| tmpl.render(ctx))
    {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template render error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("<h1>Template Error</h1><p>{}</p>", e)),
            )
                .into_response()
        }
    }
}
