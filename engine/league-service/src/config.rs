//! Service configuration management

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use ledger_journal::JournalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment overrides, e.g. `LEAGUE_LOGGING__LEVEL=debug`
pub const ENV_PREFIX: &str = "LEAGUE";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service-level configuration
    pub service: ServiceSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Journal configuration
    pub journal: JournalSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Data directory for the journal
    pub data_dir: PathBuf,

    /// Seconds between scheduled waiver runs
    pub waiver_run_interval_secs: u64,

    /// Events buffered per league event subscriber
    pub broadcast_capacity: usize,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive; `RUST_LOG` takes precedence
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,

    /// Log file path (if None, logs to stdout)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Whether to fsync on every write
    pub fsync_every_write: bool,

    /// Maximum journal file size in MB
    pub max_file_size_mb: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            waiver_run_interval_secs: 300,
            broadcast_capacity: 256,
            shutdown_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string(), file: None }
    }
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self { fsync_every_write: true, max_file_size_mb: 64 }
    }
}

impl ServiceConfig {
    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            data_dir: self.service.data_dir.clone(),
            max_file_size: self.journal.max_file_size_mb * 1024 * 1024,
            fsync_every_write: self.journal.fsync_every_write,
        }
    }

    pub fn waiver_interval(&self) -> Duration {
        Duration::from_secs(self.service.waiver_run_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            level => bail!("Invalid log level: {level}"),
        }

        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => {}
            format => bail!("Invalid log format: {format}"),
        }

        if self.service.waiver_run_interval_secs == 0 {
            bail!("waiver_run_interval_secs must be greater than 0");
        }

        if self.service.broadcast_capacity == 0 {
            bail!("broadcast_capacity must be greater than 0");
        }

        if self.journal.max_file_size_mb == 0 {
            bail!("journal max_file_size_mb must be greater than 0");
        }

        self.journal_config().validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Load configuration from an optional TOML file and `LEAGUE_*` environment variables
pub fn load_config(file: Option<&Path>) -> Result<ServiceConfig> {
    let mut builder = Config::builder();

    if let Some(path) = file {
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    let config: ServiceConfig = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.validate()?;
    Ok(config)
}
