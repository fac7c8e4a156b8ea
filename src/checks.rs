//! Smoke checks: the application is present and its database connection is active.
//!
//! Each check is a single query with no retries. Failures are reported as a
//! [`CheckError`], which distinguishes the two failure kinds.

use crate::data::health;
use crate::state::{self, AppState};
use crate::utils::fmt_duration;
use serde::Serialize;
use sqlx::PgPool;
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, warn};

pub const APPLICATION_CHECK: &str = "application";
pub const CONNECTION_CHECK: &str = "connection";

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("application not present")]
    ApplicationNotPresent,
    #[error("connection not active: pool is closed")]
    PoolClosed,
    #[error("connection not active: no application")]
    NoConnection,
    #[error("connection not active: {source}")]
    ConnectionNotActive {
        #[source]
        source: sqlx::Error,
    },
}

impl CheckError {
    /// Which of the two checks this failure belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::ApplicationNotPresent => APPLICATION_CHECK,
            CheckError::PoolClosed
            | CheckError::NoConnection
            | CheckError::ConnectionNotActive { .. } => CONNECTION_CHECK,
        }
    }
}

/// Succeeds with the installed application instance, if bootstrap completed.
pub fn application_present() -> Result<&'static AppState, CheckError> {
    state::application().ok_or(CheckError::ApplicationNotPresent)
}

/// Succeeds if the pool is open and a pooled connection answers a ping.
pub async fn connection_active(pool: &PgPool) -> Result<(), CheckError> {
    match health::is_active(pool).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(CheckError::PoolClosed),
        Err(source) => Err(CheckError::ConnectionNotActive { source }),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CheckOutcome {
    fn from_result(name: &'static str, start: Instant, result: Result<(), CheckError>) -> Self {
        let elapsed = start.elapsed();
        match result {
            Ok(()) => {
                debug!(check = name, duration = fmt_duration(elapsed), "check passed");
                Self {
                    name,
                    passed: true,
                    error: None,
                    duration_ms: elapsed.as_millis() as u64,
                }
            }
            Err(e) => {
                warn!(check = name, error = %e, duration = fmt_duration(elapsed), "check failed");
                Self {
                    name,
                    passed: false,
                    error: Some(e.to_string()),
                    duration_ms: elapsed.as_millis() as u64,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub checks: Vec<CheckOutcome>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Write one `PASS`/`FAIL` line per check.
    pub fn write_lines(&self, out: &mut impl Write) -> io::Result<()> {
        for outcome in &self.checks {
            let verdict = if outcome.passed { "PASS" } else { "FAIL" };
            match &outcome.error {
                Some(e) => writeln!(out, "{verdict} {} ({}ms): {e}", outcome.name, outcome.duration_ms)?,
                None => writeln!(out, "{verdict} {} ({}ms)", outcome.name, outcome.duration_ms)?,
            }
        }
        Ok(())
    }
}

/// Run both checks against `app`, sequentially.
///
/// Without an application there is no pool to ask, so the connection check
/// fails as well.
pub async fn run_all(app: Option<&AppState>) -> Report {
    let start = Instant::now();
    let presence = app.map(|_| ()).ok_or(CheckError::ApplicationNotPresent);
    let application = CheckOutcome::from_result(APPLICATION_CHECK, start, presence);

    let start = Instant::now();
    let liveness = match app {
        Some(app) => connection_active(&app.db_pool).await,
        None => Err(CheckError::NoConnection),
    };
    let connection = CheckOutcome::from_result(CONNECTION_CHECK, start, liveness);

    Report {
        checks: vec![application, connection],
    }
}

/// Run both checks against the installed application instance.
pub async fn run_installed() -> Report {
    run_all(state::application()).await
}
