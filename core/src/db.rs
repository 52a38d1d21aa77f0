use std::{path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::config::AppConfig;

/// Shared handle to the relational store.
///
/// Constructed once at process start and passed by reference into every store
/// that needs it; there is deliberately no process-wide static.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        if let Some(parent) = Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.database_path))
            .with_context(|| format!("invalid database path: {}", config.database_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await
            .context("failed to open sqlite database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
