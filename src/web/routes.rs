//! Web API router construction.

use axum::{Router, routing::get};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::health;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/status", get(health::status))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer,
        TimeoutLayer::new(Duration::from_secs(30)),
    ))
}
