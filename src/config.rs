//! Configuration for CaskDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CaskError, Result};

/// Main configuration for a CaskDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── caskdb.data          (active log)
    ///     └── caskdb.data.merge    (transient, only during merge)
    pub data_dir: PathBuf,

    /// File name of the active log inside `data_dir`
    pub log_file_name: String,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the active log
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// Cut a trailing partial header (under 16 bytes) off the log on open
    pub truncate_torn_tail: bool,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every put (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced puts (balanced durability/performance)
    EveryNWrites { count: usize },

    /// never fsync from the write path; the OS decides when pages hit disk
    OsManaged,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./caskdb_data"),
            log_file_name: "caskdb.data".to_string(),
            sync_strategy: SyncStrategy::EveryNWrites { count: 100 },
            truncate_torn_tail: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the active log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file_name)
    }

    /// Full path of the transient file written during merge
    pub fn merge_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.merge", self.log_file_name))
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let name = self.log_file_name.trim();
        if name.is_empty() {
            return Err(CaskError::Config("log file name must not be empty".to_string()));
        }
        if name.contains(['/', '\\']) {
            return Err(CaskError::Config(format!(
                "log file name must not contain path separators: {}",
                self.log_file_name
            )));
        }
        if let SyncStrategy::EveryNWrites { count: 0 } = self.sync_strategy {
            return Err(CaskError::Config(
                "EveryNWrites sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for the log files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the active log file name
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.log_file_name = name.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Enable or disable torn-tail truncation on open
    pub fn truncate_torn_tail(mut self, enabled: bool) -> Self {
        self.config.truncate_torn_tail = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
