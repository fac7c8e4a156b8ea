//! Router-level tests for the health, readiness, and status endpoints.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bootcheck::data::boots;
use bootcheck::state::{DATABASE_SERVICE, ServiceStatus};
use helpers::{get_json, router};
use sqlx::PgPool;
use tower::ServiceExt;

#[sqlx::test]
async fn health_is_always_ok(pool: PgPool) {
    let (_, router) = router(&pool);
    pool.close().await;

    let (status, _, body) = get_json(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[sqlx::test]
async fn ready_passes_with_live_database(pool: PgPool) {
    let (state, router) = router(&pool);

    let (status, _, body) = get_json(&router, "/api/health/ready").await;
    assert_eq!(status, StatusCode::OK);

    let checks = body["checks"].as_array().expect("checks array");
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0]["name"], "application");
    assert_eq!(checks[1]["name"], "connection");
    assert!(checks.iter().all(|c| c["passed"] == true));

    assert_eq!(
        state.service_statuses.get(DATABASE_SERVICE),
        Some(ServiceStatus::Connected)
    );
}

#[sqlx::test]
async fn ready_fails_once_pool_is_closed(pool: PgPool) {
    let (state, router) = router(&pool);
    pool.close().await;

    let (status, _, body) = get_json(&router, "/api/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"][0]["passed"], true);
    assert_eq!(body["checks"][1]["passed"], false);
    assert_eq!(
        body["checks"][1]["error"],
        "connection not active: pool is closed"
    );

    assert_eq!(
        state.service_statuses.get(DATABASE_SERVICE),
        Some(ServiceStatus::Error)
    );

    let (_, _, status_body) = get_json(&router, "/api/status").await;
    assert_eq!(status_body["status"], "error");
}

#[sqlx::test]
async fn status_reports_services_and_last_boot(pool: PgPool) {
    let (state, router) = router(&pool);

    let (_, _, empty) = get_json(&router, "/api/status").await;
    assert_eq!(empty["status"], "disabled");
    assert!(empty.get("lastBoot").is_none());

    state
        .service_statuses
        .set(DATABASE_SERVICE, ServiceStatus::Connected);
    let boot = boots::record(&pool, "9.9.9", "deadbeef")
        .await
        .expect("failed to record boot");

    let (status, _, body) = get_json(&router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["services"]["database"]["status"], "connected");
    assert_eq!(body["services"]["database"]["updatedSecsAgo"], 0);
    assert_eq!(body["lastBoot"]["id"], boot.id);
    assert_eq!(body["lastBoot"]["commitHash"], "deadbeef");
}

#[sqlx::test]
async fn responses_carry_request_id_and_security_headers(pool: PgPool) {
    let (_, router) = router(&pool);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/health")
                .header("x-railway-request-id", "edge-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "edge-123");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("strict-transport-security"));

    let (_, local_headers, _) = get_json(&router, "/api/health").await;
    assert!(local_headers.contains_key("x-request-id"));
    assert!(!local_headers.contains_key("strict-transport-security"));
}

#[sqlx::test]
async fn unknown_route_is_not_found(pool: PgPool) {
    let (_, router) = router(&pool);
    let (status, headers, _) = get_json(&router, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.contains_key("x-request-id"));
}
