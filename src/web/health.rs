//! Health, readiness, and status handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{trace, warn};

use crate::checks;
use crate::data::boots::{self, BootRow};
use crate::state::{AppState, DATABASE_SERVICE, ServiceStatus};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
    updated_secs_ago: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: ServiceStatus,
    version: &'static str,
    commit: &'static str,
    uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_boot: Option<BootRow>,
    services: BTreeMap<String, ServiceInfo>,
}

/// Fold individual service statuses into one overall status.
pub fn overall_status<'a>(statuses: impl IntoIterator<Item = &'a ServiceStatus>) -> ServiceStatus {
    let mut any = false;
    for status in statuses {
        if *status == ServiceStatus::Error {
            return ServiceStatus::Error;
        }
        any = true;
    }
    if any {
        ServiceStatus::Active
    } else {
        ServiceStatus::Disabled
    }
}

/// `GET /api/health` -- liveness; answers as long as the process serves HTTP.
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// `GET /api/health/ready` -- runs the smoke checks against the serving application.
pub(super) async fn ready(State(state): State<AppState>) -> Response {
    let report = checks::run_all(Some(&state)).await;
    let connected = report
        .checks
        .iter()
        .any(|c| c.name == checks::CONNECTION_CHECK && c.passed);
    state.service_statuses.set(
        DATABASE_SERVICE,
        if connected {
            ServiceStatus::Connected
        } else {
            ServiceStatus::Error
        },
    );
    let code = if report.passed() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report)).into_response()
}

/// `GET /api/status` -- per-service statuses, build info, and the last recorded boot.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, entry)| {
            (
                name.clone(),
                ServiceInfo {
                    name,
                    status: entry.status,
                    updated_secs_ago: entry.updated_at.elapsed().as_secs(),
                },
            )
        })
        .collect();

    let last_boot = match boots::latest(&state.db_pool).await {
        Ok(row) => row,
        Err(e) => {
            warn!(error = %e, "Failed to load last boot for status");
            None
        }
    };

    Json(StatusResponse {
        status: overall_status(services.values().map(|s| &s.status)),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_HASH"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        last_boot,
        services,
    })
}
