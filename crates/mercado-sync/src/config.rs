//! # Mercado Configuration
//!
//! Runtime settings for the stores and the engine. Business settings
//! (exchange rates, tax, permissions) are NOT here: they live in the
//! `config/main` document so every register shares them.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MERCADO_DB_PATH=/var/lib/mercado/mercado.db                        │
//! │     MERCADO_MAX_BATCH_OPS=450                                          │
//! │     MERCADO_COMMIT_ATTEMPTS=5                                          │
//! │     MERCADO_LOG=info,mercado=debug                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mercado-pos/mercado.toml (Linux)                         │
//! │     ~/Library/Application Support/com.mercado.pos/mercado.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! db_path = "/var/lib/mercado/mercado.db"
//! max_connections = 5
//!
//! [remote]
//! max_batch_ops = 450
//!
//! [engine]
//! max_commit_attempts = 5
//! initial_backoff_ms = 20
//! max_backoff_ms = 500
//!
//! [logging]
//! filter = "info,mercado=debug,sqlx=warn"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use mercado_store::{LocalConfig, RemoteConfig, DEFAULT_MAX_BATCH_OPS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Default tracing filter when neither the file nor the environment set one.
pub const DEFAULT_LOG_FILTER: &str = "info,mercado=debug,sqlx=warn";

// =============================================================================
// Store Settings
// =============================================================================

/// Local (demo mode) database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite file. Defaults to `mercado.db` in the platform data dir.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            db_path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Per-commit write ceiling.
    #[serde(default = "default_max_batch_ops")]
    pub max_batch_ops: usize,
}

fn default_max_batch_ops() -> usize {
    DEFAULT_MAX_BATCH_OPS
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            max_batch_ops: default_max_batch_ops(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Conflict retry policy for sales, payments and stock adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Total commit attempts, including the first one.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_commit_attempts() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    20
}
fn default_max_backoff() -> u64 {
    500
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_commit_attempts: default_max_commit_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl EngineSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MercadoConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LogSettings,
}

impl MercadoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (mercado.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigFile("no config directory on this platform".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.remote.max_batch_ops == 0 {
            return Err(SyncError::InvalidConfig(
                "max_batch_ops must be greater than 0".into(),
            ));
        }

        if self.engine.max_commit_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_commit_attempts must be greater than 0".into(),
            ));
        }

        if self.store.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.initial_backoff_ms > self.engine.max_backoff_ms {
            return Err(SyncError::InvalidConfig(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.engine.initial_backoff_ms, self.engine.max_backoff_ms
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MERCADO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.db_path = Some(PathBuf::from(path));
        }

        if let Ok(max) = std::env::var("MERCADO_MAX_BATCH_OPS") {
            match max.parse::<usize>() {
                Ok(m) => self.remote.max_batch_ops = m,
                Err(_) => warn!(value = %max, "Ignoring invalid MERCADO_MAX_BATCH_OPS"),
            }
        }

        if let Ok(attempts) = std::env::var("MERCADO_COMMIT_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(a) => self.engine.max_commit_attempts = a,
                Err(_) => warn!(value = %attempts, "Ignoring invalid MERCADO_COMMIT_ATTEMPTS"),
            }
        }

        if let Ok(filter) = std::env::var("MERCADO_LOG") {
            self.logging.filter = filter;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "mercado", "pos")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("mercado.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database path: configured, else platform data dir, else cwd.
    pub fn db_path(&self) -> PathBuf {
        self.store
            .db_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("mercado.db")))
            .unwrap_or_else(|| PathBuf::from("mercado.db"))
    }

    pub fn local_config(&self) -> LocalConfig {
        LocalConfig::new(self.db_path()).max_connections(self.store.max_connections)
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::default().max_batch_ops(self.remote.max_batch_ops)
    }
}
