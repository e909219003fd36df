//! Configuration for the ledger journal

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Base directory for journal files
    pub data_dir: PathBuf,

    /// Maximum size of a single journal file before rotation
    pub max_file_size: u64,

    /// Whether to fsync on every write
    pub fsync_every_write: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            max_file_size: 64 * 1024 * 1024, // 64MB
            fsync_every_write: true,
        }
    }
}

impl JournalConfig {
    /// Create a new configuration with custom data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Default::default() }
    }

    /// Get the journal directory path
    pub fn journal_dir(&self) -> PathBuf {
        self.data_dir.join("journal")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_size == 0 {
            return Err("journal max_file_size must be greater than 0".to_string());
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err("journal data_dir must not be empty".to_string());
        }

        Ok(())
    }
}
