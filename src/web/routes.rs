use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::api::root))
        .route("/health", get(handlers::api::health))
        .route("/tables", get(handlers::api::list_tables))
        .route("/query", post(handlers::api::execute_raw_query))
        .route("/ask", post(handlers::api::ask_question))
        .route("/debug/config", get(handlers::api::debug_config))
}
