//! Application state shared across components, and the process-wide instance.

use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Service name under which the database pool reports its health.
pub const DATABASE_SERVICE: &str = "database";
/// Service name under which the HTTP listener reports its health.
pub const WEB_SERVICE: &str = "web";

/// Health status of a service.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Connected,
    Disabled,
    Error,
}

/// A timestamped status entry for a service.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: ServiceStatus,
    pub updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status)
    }

    /// Returns a snapshot of all service statuses, sorted by name.
    pub fn all(&self) -> Vec<(String, StatusEntry)> {
        let mut entries: Vec<_> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub service_statuses: ServiceStatusRegistry,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            db_pool,
            service_statuses: ServiceStatusRegistry::new(),
            started_at: Instant::now(),
        }
    }
}

static APPLICATION: OnceLock<AppState> = OnceLock::new();

/// Install `state` as the process-wide application instance.
///
/// The first install wins; returns `false` if an instance was already present.
pub fn install(state: AppState) -> bool {
    APPLICATION.set(state).is_ok()
}

/// The installed application instance, if bootstrap has completed.
pub fn application() -> Option<&'static AppState> {
    APPLICATION.get()
}
