use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::exec::{DbEngine, ExecError, ResultSet, SchemaReport};
use crate::llm::LlmError;
use crate::web::state::AppState;

// Request/response types

#[derive(Debug, Deserialize)]
pub struct NlToSqlRequest {
    pub text_description: String,
    #[serde(default)]
    pub db_engine: DbEngine,
}

#[derive(Debug, Serialize)]
pub struct SqlCodeResponse {
    pub sql_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteSqlRequest {
    pub sql_code: String,
    #[serde(default)]
    pub db_engine: DbEngine,
}

#[derive(Debug, Serialize)]
pub struct ExecuteSqlResponse {
    pub sql_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaQuery {
    #[serde(default)]
    pub db_engine: DbEngine,
}

#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub engine: DbEngine,
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub engines: Vec<EngineStatus>,
}

// Handlers

/// POST /api/nl-to-sql
pub async fn nl_to_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlToSqlRequest>,
) -> Result<Json<SqlCodeResponse>, (StatusCode, String)> {
    if payload.text_description.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "text_description must not be empty".to_string(),
        ));
    }

    info!(engine = %payload.db_engine, "nl-to-sql request");

    let sql_code = state
        .llm_manager
        .sql_from_text(&payload.text_description, payload.db_engine)
        .await
        .map_err(map_llm_error)?;

    Ok(Json(SqlCodeResponse { sql_code }))
}

/// POST /api/er-to-sql (multipart: file + db_engine)
pub async fn er_to_sql(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SqlCodeResponse>, (StatusCode, String)> {
    let mut image: Option<(Vec<u8>, String)> = None;
    let mut engine = DbEngine::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid multipart body: {}", e),
        )
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let declared = field.content_type().map(|m| m.to_string());
                let filename = field.file_name().map(|f| f.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("failed to read uploaded file: {}", e),
                    )
                })?;
                let content_type = resolve_image_type(declared.as_deref(), filename.as_deref())
                    .ok_or_else(|| {
                        (
                            StatusCode::BAD_REQUEST,
                            "uploaded file must be an image".to_string(),
                        )
                    })?;
                image = Some((bytes.to_vec(), content_type));
            }
            Some("db_engine") => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("failed to read db_engine field: {}", e),
                    )
                })?;
                engine = text
                    .parse()
                    .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
            }
            _ => {}
        }
    }

    let (bytes, content_type) = image.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "missing file field".to_string(),
        )
    })?;
    if bytes.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "uploaded file is empty".to_string(),
        ));
    }

    info!(engine = %engine, bytes = bytes.len(), content_type = %content_type, "er-to-sql request");

    let sql_code = state
        .llm_manager
        .sql_from_diagram(&bytes, &content_type, engine)
        .await
        .map_err(map_llm_error)?;

    Ok(Json(SqlCodeResponse { sql_code }))
}

/// The upload must be an image. Browsers occasionally send
/// application/octet-stream, in which case the filename decides.
fn resolve_image_type(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
    if let Some(ct) = declared {
        if ct.starts_with("image/") {
            return Some(ct.to_string());
        }
        if ct != "application/octet-stream" {
            return None;
        }
    }
    let guess = mime_guess::from_path(filename?).first()?;
    (guess.type_() == mime_guess::mime::IMAGE).then(|| guess.to_string())
}

/// POST /api/execute-sql
///
/// SQL-level failures come back as a 200 with `error` set so the UI can show
/// the partial log; only validation and configuration problems are HTTP
/// errors.
pub async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteSqlRequest>,
) -> Result<Json<ExecuteSqlResponse>, (StatusCode, String)> {
    if payload.sql_code.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "sql_code must not be empty".to_string(),
        ));
    }

    let report = state
        .executor
        .execute(&payload.sql_code, payload.db_engine)
        .await
        .map_err(map_exec_error)?;

    if let Some(err) = &report.error {
        warn!(engine = %payload.db_engine, error = %err, "sql execution failed");
    } else {
        debug!(engine = %payload.db_engine, "sql execution succeeded");
    }

    Ok(Json(ExecuteSqlResponse {
        sql_code: payload.sql_code,
        execution_log: if report.log.is_empty() {
            None
        } else {
            Some(report.log)
        },
        error: report.error,
        results: report.results,
    }))
}

/// GET /api/schema?db_engine=...
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SchemaQuery>,
) -> Result<Json<SchemaReport>, (StatusCode, String)> {
    let report = state
        .executor
        .schema(query.db_engine)
        .await
        .map_err(map_exec_error)?;

    Ok(Json(report))
}

/// GET /api/status
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    let engines = DbEngine::ALL
        .iter()
        .map(|&engine| EngineStatus {
            engine,
            configured: state.executor.engine_configured(engine),
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        engines,
    })
}

fn map_llm_error(err: LlmError) -> (StatusCode, String) {
    let status = match &err {
        LlmError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        // Upstream unavailable or talking nonsense
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

fn map_exec_error(err: ExecError) -> (StatusCode, String) {
    let status = match &err {
        ExecError::Unconfigured(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
