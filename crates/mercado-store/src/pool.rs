//! # SQLite Pool Management
//!
//! Connection pool creation for the local store.
//!
//! ```text
//!   LocalConfig::new(path) ─► open_pool(&config) ─► SqlitePool ─► migrations
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL mode: readers never block the single writer,
//! and a crash loses at most the last transaction.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migrations;

/// Local store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = LocalConfig::new("/path/to/mercado.db").max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Path to the SQLite database file. `None` means in-memory.
    pub database_path: Option<PathBuf>,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl LocalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// An isolated in-memory database (tests, throwaway demos).
    ///
    /// Uses one connection that never expires: closing it would drop the
    /// data.
    pub fn in_memory() -> Self {
        Self {
            database_path: None,
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.is_none()
    }
}

/// Opens the pool and (optionally) migrates it.
pub async fn open_pool(config: &LocalConfig) -> StoreResult<SqlitePool> {
    let (connect_options, pool_options) = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "Opening local store");
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
                }
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(1)
                .acquire_timeout(config.connect_timeout);
            (options, pool)
        }
        None => {
            info!("Opening in-memory local store");
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(config.connect_timeout);
            (options, pool)
        }
    };

    debug!("Connection options configured");

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    if config.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_is_migrated() {
        let pool = open_pool(&LocalConfig::in_memory()).await.unwrap();
        let (total, applied) = migrations::migration_status(&pool).await.unwrap();
        assert_eq!(total, applied);
        assert!(sqlx::query("SELECT 1 FROM documents LIMIT 1")
            .execute(&pool)
            .await
            .is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = LocalConfig::new("/tmp/mercado.db")
            .max_connections(10)
            .run_migrations(false);
        assert_eq!(config.max_connections, 10);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(LocalConfig::in_memory().is_in_memory());
    }
}
