// Roster Server - Main Entry Point
//
// This file contains only the application bootstrap logic and CLI commands.
// All handlers, routes, and business logic are in separate modules.

pub use roster_server::*;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::{Error as DotenvError, dotenv, from_filename};
use roster_core::{AppConfig, Database};
use roster_server::utils::db::run_migrations;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Roster server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_status = load_env_file();
    init_tracing();
    report_env_status(&env_status);

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Migrate => run_migrate(config).await,
    }
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        database_path = %config.database_path,
        database_max_connections = config.database_max_connections,
        "Starting server with database configuration"
    );

    let database = Database::connect(&config).await?;
    run_migrations(database.pool())
        .await
        .context("failed to run database migrations")?;

    let state = build_state(&database);
    info!(
        version = %state.metadata.version,
        environment = %state.metadata.environment,
        "Loaded server metadata"
    );

    let app = router::build_router(state);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind socket")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local address")?;

    info!("listening on {actual_addr}");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(?err, "server terminated with error");
    }

    Ok(())
}

async fn run_migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config).await?;
    run_migrations(database.pool())
        .await
        .context("failed to run database migrations")?;
    info!("migrations completed");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // ROSTER_LOG_JSON switches to machine-readable output for log shippers.
    let log_json = std::env::var("ROSTER_LOG_JSON")
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false);

    if log_json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

enum EnvLoadStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(DotenvError),
}

fn load_env_file() -> EnvLoadStatus {
    if let Ok(env_file) = std::env::var("ROSTER_ENV_FILE") {
        let trimmed = env_file.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            return match from_filename(&path) {
                Ok(_) => {
                    let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
                    EnvLoadStatus::Loaded(display_path)
                }
                Err(err) => EnvLoadStatus::Failed(err),
            };
        }
    }

    match dotenv() {
        Ok(path) => {
            let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
            EnvLoadStatus::Loaded(display_path)
        }
        Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            EnvLoadStatus::NotFound
        }
        Err(err) => EnvLoadStatus::Failed(err),
    }
}

fn report_env_status(status: &EnvLoadStatus) {
    match status {
        EnvLoadStatus::Loaded(path) => {
            info!("Loaded environment variables from {}", path.display());
        }
        EnvLoadStatus::NotFound => {
            info!("No .env file found; using process environment only");
        }
        EnvLoadStatus::Failed(err) => {
            warn!("Failed to load .env file: {err:?}");
        }
    }
}

fn make_relative(path: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    path.strip_prefix(&cwd).map(|p| p.to_path_buf()).ok()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = term.recv() => {},
            _ = int.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
