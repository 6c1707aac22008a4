use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for picking control
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PickingControlConfig {
    /// Record store selection
    pub store: StoreConfig,
    /// Database settings (used by the sqlite backend)
    pub database: Option<DatabaseConfig>,
    /// Read-modify-write behaviour
    pub workflow: WorkflowConfig,
    /// Bulk import behaviour
    pub import: ImportConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Path of the JSON document used by the json backend
    pub json_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// How many times a status change or reassignment re-reads and retries
    /// after losing a compare-and-set race
    pub max_conflict_retries: u32,
    /// Backoff for reads and writes that hit a transient store failure
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    pub log_level: String,
    /// Emit JSON log lines instead of the compact format
    pub json_logs: bool,
    /// Log workflow counters on exit
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl Default for PickingControlConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Json,
                json_path: PathBuf::from(".picking-control/pickings.json"),
            },
            database: Some(DatabaseConfig {
                url: "sqlite://.picking-control/pickings.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            }),
            workflow: WorkflowConfig {
                max_conflict_retries: 3,
                retry: RetryConfig::default(),
            },
            import: ImportConfig {
                retry: RetryConfig::default(),
            },
            observability: ObservabilityConfig::default(),
        }
    }
}

impl PickingControlConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file at `path`, if it exists
    /// 3. Environment variables (prefixed with PICKING_CONTROL__)
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("PICKING_CONTROL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
