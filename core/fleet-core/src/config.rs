//! Engine policy configuration loading and saving.
//!
//! Every field has a default, so a missing or partial `config.json` still yields
//! a usable configuration. The defaults reproduce the field behavior observed on
//! the fleet: default-open status for vehicles without a check, and final meter
//! readings that warn rather than block a session close.

use std::io::Write;
use std::path::Path;

use chrono::Duration;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{FleetError, Result, StoreError};
use crate::hour_meter::DEFAULT_DISPLAY_DECIMALS;
use crate::storage::StorageConfig;

/// Status reported for a vehicle with no check on file and no active session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum MissingCheckPolicy {
    #[default]
    Available,
    Unknown,
}

/// What an invalid final hour-meter reading does to a session close.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum FinalMeterPolicy {
    /// Close anyway; the reading is dropped and a warning recorded on the session.
    #[default]
    Warn,
    /// Refuse the close with `InvalidHourMeter`.
    Reject,
}

fn default_true() -> bool {
    true
}

fn default_decimals() -> u32 {
    DEFAULT_DISPLAY_DECIMALS
}

fn default_pending_overdue_minutes() -> u32 {
    30
}

fn default_in_progress_expiry_minutes() -> u32 {
    60
}

fn default_max_session_hours() -> u32 {
    12
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct EngineConfig {
    #[serde(default)]
    pub missing_check_policy: MissingCheckPolicy,
    #[serde(default)]
    pub final_meter_policy: FinalMeterPolicy,
    /// Session start requires the referenced check to be the vehicle's latest passing check.
    #[serde(default = "default_true")]
    pub require_passed_check: bool,
    #[serde(default = "default_decimals")]
    pub meter_display_decimals: u32,
    #[serde(default = "default_pending_overdue_minutes")]
    pub pending_overdue_minutes: u32,
    #[serde(default = "default_in_progress_expiry_minutes")]
    pub in_progress_expiry_minutes: u32,
    #[serde(default = "default_max_session_hours")]
    pub max_session_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            missing_check_policy: MissingCheckPolicy::default(),
            final_meter_policy: FinalMeterPolicy::default(),
            require_passed_check: default_true(),
            meter_display_decimals: default_decimals(),
            pending_overdue_minutes: default_pending_overdue_minutes(),
            in_progress_expiry_minutes: default_in_progress_expiry_minutes(),
            max_session_hours: default_max_session_hours(),
        }
    }
}

impl EngineConfig {
    pub fn pending_overdue(&self) -> Duration {
        Duration::minutes(i64::from(self.pending_overdue_minutes))
    }

    pub fn in_progress_expiry(&self) -> Duration {
        Duration::minutes(i64::from(self.in_progress_expiry_minutes))
    }

    pub fn max_session_duration(&self) -> Duration {
        Duration::hours(i64::from(self.max_session_hours))
    }
}

/// Loads the engine configuration, returning defaults if the file is missing or malformed.
pub fn load_engine_config(storage: &StorageConfig) -> EngineConfig {
    let path = storage.config_file();
    match try_load_engine_config(&path) {
        Ok(Some(config)) => config,
        Ok(None) => EngineConfig::default(),
        Err(e) => {
            warn!(error = %e, "Falling back to default engine config");
            EngineConfig::default()
        }
    }
}

/// Strict variant: `Ok(None)` when the file is absent, an error when it is unreadable.
pub fn try_load_engine_config(path: &Path) -> Result<Option<EngineConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| FleetError::ConfigMalformed {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
}

/// Saves the engine configuration atomically.
pub fn save_engine_config(storage: &StorageConfig, config: &EngineConfig) -> Result<()> {
    let path = storage.config_file();
    let content = serde_json::to_string_pretty(config).map_err(|e| StoreError::Json {
        context: "serializing engine config".to_string(),
        source: e,
    })?;

    let dir = storage.root();
    fs::create_dir_all(dir).map_err(|e| StoreError::Io {
        context: format!("creating {}", dir.display()),
        source: e,
    })?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: e,
    })?;
    tmp.write_all(content.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| StoreError::Io {
            context: format!("writing temp file for {}", path.display()),
            source: e,
        })?;
    tmp.persist(&path).map_err(|e| StoreError::Io {
        context: format!("persisting {}", path.display()),
        source: e.error,
    })?;
    Ok(())
}
