use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::db::bootstrap;
use crate::pipeline::ResponseEnvelope;
use crate::web::state::AppState;

const MAX_QUESTION_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct RawQueryRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub tables: Vec<String>,
    pub ai_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type EnvelopeResponse = (StatusCode, Json<ResponseEnvelope>);

fn unprocessable(message: impl Into<String>) -> EnvelopeResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ResponseEnvelope::failure(message)),
    )
}

// Service info
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "NL-Teller API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "tables": "/tables",
    }))
}

// Health check: database liveness plus the table inventory
pub async fn health(state: State<Arc<AppState>>) -> Json<HealthResponse> {
    match state.db_pool.get() {
        Ok(conn) if bootstrap::ping(&conn) => {
            let tables = bootstrap::list_tables(&conn).unwrap_or_default();
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "duckdb".to_string(),
                tables,
                ai_ready: state.ai_ready,
                error: None,
            })
        }
        Ok(_) => Json(unhealthy(state.ai_ready, "database ping failed".to_string())),
        Err(e) => {
            error!("health check failed to get a connection: {e}");
            Json(unhealthy(state.ai_ready, "database connection unavailable".to_string()))
        }
    }
}

fn unhealthy(ai_ready: bool, error: String) -> HealthResponse {
    HealthResponse {
        status: "unhealthy".to_string(),
        database: "duckdb".to_string(),
        tables: Vec::new(),
        ai_ready,
        error: Some(error),
    }
}

// Schema metadata, rendered from the catalog rather than the live database
// so the response always matches what the validator will authorize.
pub async fn list_tables(state: State<Arc<AppState>>) -> Json<serde_json::Value> {
    let tables: Vec<serde_json::Value> = state
        .catalog
        .tables()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "columns": t.columns.iter().map(|c| c.name).collect::<Vec<_>>(),
            })
        })
        .collect();

    Json(json!({ "count": tables.len(), "tables": tables }))
}

// Raw SQL path: validator → executor, no LLM involvement.
pub async fn execute_raw_query(
    state: State<Arc<AppState>>,
    payload: Result<Json<RawQueryRequest>, JsonRejection>,
) -> EnvelopeResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return unprocessable(format!("Request validation error: {rejection}"));
        }
    };

    if request.sql.trim().is_empty() {
        return unprocessable("SQL query cannot be empty");
    }

    let envelope = state.orchestrator.run_raw_sql(&request.sql).await;
    // Validator rejections are business-level refusals, not transport errors.
    (StatusCode::OK, Json(envelope))
}

// Natural-language path: the full agent pipeline.
pub async fn ask_question(
    state: State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> EnvelopeResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return unprocessable(format!("Request validation error: {rejection}"));
        }
    };

    let question = request.query.trim();
    if question.is_empty() {
        return unprocessable("Query cannot be empty");
    }
    if question.len() > MAX_QUESTION_LENGTH {
        return unprocessable(format!(
            "Query must be at most {MAX_QUESTION_LENGTH} characters"
        ));
    }

    let envelope = state.orchestrator.answer_question(question).await;
    (StatusCode::OK, Json(envelope))
}

// Redacted configuration dump, only reachable in debug mode.
pub async fn debug_config(
    state: State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !state.config.debug {
        return Err(StatusCode::NOT_FOUND);
    }

    // Hide credentials that may be embedded in the database URL.
    let database = state
        .config
        .database
        .url
        .rsplit('@')
        .next()
        .unwrap_or_default();

    Ok(Json(json!({
        "app_name": "nl-teller",
        "version": env!("CARGO_PKG_VERSION"),
        "debug": state.config.debug,
        "database": database,
        "allowed_tables": state.catalog.allowed_tables(),
        "query_timeout_seconds": state.config.query.timeout_seconds,
        "max_result_rows": state.config.query.max_result_rows,
        "max_retries": state.config.query.max_retries,
    })))
}
