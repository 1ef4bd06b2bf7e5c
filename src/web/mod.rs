pub mod handlers;
pub mod routes;
pub mod state;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::WebConfig;
use self::routes::api_routes;
use self::state::AppState;

pub async fn run_server(
    config: WebConfig,
    app_state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = Router::new()
        .merge(api_routes())
        .fallback(fallback_handler)
        .with_state(app_state)
        .layer(cors_layer(&config))
        .layer(CatchPanicLayer::custom(internal_error_response));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting nl-teller server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Only GET and POST, only whitelisted origins.
fn cors_layer(config: &WebConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

// Fallback handler for unmatched routes
async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "The requested resource was not found")
}

/// Last line of defense: a panicking handler still yields the contract
/// envelope with a generic message. Details go to the log only.
fn internal_error_response(
    err: Box<dyn std::any::Any + Send + 'static>,
) -> axum::response::Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("request handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(crate::pipeline::ResponseEnvelope::failure(
            "An internal server error occurred",
        )),
    )
        .into_response()
}
