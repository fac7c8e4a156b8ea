//! Shared helpers for router-level tests.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bootcheck::state::AppState;
use bootcheck::web::create_router;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build the full router around `pool`.
pub fn router(pool: &PgPool) -> (AppState, Router) {
    let state = AppState::new(pool.clone());
    let router = create_router(state.clone());
    (state, router)
}

/// Issue a GET and return the status, headers, and parsed JSON body.
pub async fn get_json(router: &Router, path: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}
