use crate::checks;
use crate::config::Config;
use crate::data::boots;
use crate::state::{self, AppState, DATABASE_SERVICE, ServiceStatus, WEB_SERVICE};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    db_pool: PgPool,
    app_state: AppState,
}

impl App {
    /// Connect to the database, run migrations, and install the application instance.
    ///
    /// Nothing is installed unless every step succeeds.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db_pool = Self::connect(&config).await?;

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        // Non-fatal: the boot log is informational.
        match boots::record(&db_pool, env!("CARGO_PKG_VERSION"), env!("GIT_COMMIT_HASH")).await {
            Ok(boot) => info!(boot_id = boot.id, "Boot recorded"),
            Err(e) => warn!(error = ?e, "Failed to record boot (non-fatal)"),
        }

        let app = Self::with_pool(config, db_pool);
        app.app_state
            .service_statuses
            .set(DATABASE_SERVICE, ServiceStatus::Connected);

        if !state::install(app.app_state.clone()) {
            warn!("Application instance already installed; keeping the existing one");
        }

        Ok(app)
    }

    /// Assemble an application around an existing pool without installing it.
    ///
    /// The web service starts out as `starting` until [`App::serve_until`] is listening.
    pub fn with_pool(config: Config, db_pool: PgPool) -> Self {
        let app_state = AppState::new(db_pool.clone());
        app_state
            .service_statuses
            .set(WEB_SERVICE, ServiceStatus::Starting);
        App {
            config,
            db_pool,
            app_state,
        }
    }

    async fn connect(config: &Config) -> Result<PgPool, anyhow::Error> {
        // Private networking gets a tighter slow-acquire threshold.
        let is_private = config.database_url.contains("railway.internal");
        let slow_threshold = Duration::from_millis(if is_private { 200 } else { 500 });

        let connect_options = PgConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(config.db_max_connections)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(config.db_acquire_timeout)
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            is_private = is_private,
            max_connections = config.db_max_connections,
            acquire_timeout = fmt_duration(config.db_acquire_timeout),
            idle_timeout = "2m",
            max_lifetime = "30m",
            acquire_slow_threshold = fmt_duration(slow_threshold),
            "database pool established"
        );

        Ok(db_pool)
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Run the smoke checks against the installed instance and print one line per check.
    pub async fn check(self) -> ExitCode {
        let report = checks::run_installed().await;
        if let Err(e) = report.write_lines(&mut std::io::stdout().lock()) {
            error!(error = ?e, "Failed to write check report");
        }
        self.db_pool.close().await;

        if report.passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// Bind `0.0.0.0:PORT` and serve until SIGINT/SIGTERM.
    pub async fn serve(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = ?e, %addr, "Failed to bind web server");
                self.app_state
                    .service_statuses
                    .set(WEB_SERVICE, ServiceStatus::Error);
                return ExitCode::FAILURE;
            }
        };

        self.serve_until(listener, shutdown_signal()).await.into()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain within the shutdown timeout.
    ///
    /// `shutdown` resolves with a label for the log line (the signal name).
    pub async fn serve_until<F>(self, listener: TcpListener, shutdown: F) -> ServeOutcome
    where
        F: Future<Output = &'static str>,
    {
        let addr = listener.local_addr().ok();
        let statuses = self.app_state.service_statuses.clone();
        let router = create_router(self.app_state.clone());
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });
        statuses.set(WEB_SERVICE, ServiceStatus::Active);
        info!(addr = ?addr, "web server listening");

        tokio::select! {
            result = &mut server => {
                error!(result = ?result, "web server exited unexpectedly");
                statuses.set(WEB_SERVICE, ServiceStatus::Error);
                self.db_pool.close().await;
                return ServeOutcome::Failed;
            }
            signal = shutdown => {
                info!(signal, timeout = fmt_duration(self.config.shutdown_timeout), "shutdown signal received");
            }
        }

        statuses.set(WEB_SERVICE, ServiceStatus::Disabled);
        let _ = shutdown_tx.send(());

        let outcome = match tokio::time::timeout(self.config.shutdown_timeout, &mut server).await {
            Ok(Ok(Ok(()))) => {
                info!("graceful shutdown complete");
                ServeOutcome::Graceful
            }
            Ok(Ok(Err(e))) => {
                error!(error = ?e, "web server failed during shutdown");
                ServeOutcome::Failed
            }
            Ok(Err(e)) => {
                error!(error = ?e, "web server task panicked");
                ServeOutcome::Failed
            }
            Err(_) => {
                warn!("shutdown timed out; aborting in-flight requests");
                server.abort();
                ServeOutcome::TimedOut
            }
        };

        self.db_pool.close().await;
        outcome
    }
}

/// How a serving run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// In-flight requests drained within the shutdown timeout.
    Graceful,
    /// The shutdown timeout elapsed and remaining requests were aborted.
    TimedOut,
    /// The server stopped on its own or failed while draining.
    Failed,
}

impl From<ServeOutcome> for ExitCode {
    fn from(outcome: ServeOutcome) -> Self {
        match outcome {
            ServeOutcome::Graceful => ExitCode::SUCCESS,
            ServeOutcome::TimedOut | ServeOutcome::Failed => ExitCode::FAILURE,
        }
    }
}

/// Resolves with the name of the first shutdown signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
