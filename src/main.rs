use bootcheck::app::App;
use bootcheck::cli::{Args, Command};
use bootcheck::config::Config;
use bootcheck::logging::setup_logging;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Config comes first so logging is ready before any startup logs are emitted.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    let command = args.command.unwrap_or(Command::Serve);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        command = ?command,
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting bootcheck"
    );

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application");
            if command == Command::Check {
                println!("FAIL application: {e:#}");
            }
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Serve => app.serve().await,
        Command::Check => app.check().await,
    }
}
