//! Storage configuration and path management.
//!
//! Centralizes every on-disk location the engine touches so tests (and clients
//! with sandboxed app directories) can inject their own root.

use std::path::{Path, PathBuf};

/// Central configuration for all fleet-core storage paths.
///
/// Production code uses `StorageConfig::default()` which points at the platform
/// local data directory. Tests use `StorageConfig::with_root(temp_dir)`.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            root: base.join("fleet-safety"),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (engine policy flags).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to snapshot.json (checks, sessions, meters, rotation cursors).
    pub fn snapshot_file(&self) -> PathBuf {
        self.root.join("snapshot.json")
    }

    /// Directory for rolling log files written by diagnostic tools.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
