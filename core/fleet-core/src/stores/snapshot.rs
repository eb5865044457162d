//! File-backed local snapshot of checks, sessions, meters and rotation cursors.
//!
//! Lets a client keep operating state across restarts while the backend is
//! unreachable. Everything lives in one JSON file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "checks": { "01J...": { ... CheckInstance ... } },
//!   "latest_check": { "vehicle-1": "01J..." },
//!   "sessions": { "01J...": { ... VehicleSession ... } },
//!   "meters": { "vehicle-1": { "value": 120.5, "recorded_at": "..." } },
//!   "cursors": { "vehicle-1": { ... RotationCursor ... } }
//! }
//! ```
//!
//! # Defensive Loading
//!
//! Empty files, corrupt JSON and unknown versions load as an empty store with a
//! warning rather than failing the client.
//!
//! # Atomic Writes
//!
//! Every mutation is applied to a copy, written to a temp file in the same
//! directory and renamed over the snapshot. The in-memory state only changes
//! once the write succeeded.
//!
//! # Compaction
//!
//! Before each write, superseded records are dropped. Per vehicle, the file keeps
//! the latest check, any check an OPERATING session started from, every
//! OPERATING session and the most recently started closed session. The file
//! grows with the fleet, not with its history.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::StoreError;
use crate::types::{CheckInstance, HourMeterReading, RotationCursor, VehicleSession};

use super::{CheckInstanceStore, RotationCursorStore, SessionStore, VehicleMeterStore};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    #[serde(default)]
    checks: HashMap<String, CheckInstance>,
    #[serde(default)]
    latest_check: HashMap<String, String>,
    #[serde(default)]
    sessions: HashMap<String, VehicleSession>,
    #[serde(default)]
    meters: HashMap<String, HourMeterReading>,
    #[serde(default)]
    cursors: HashMap<String, RotationCursor>,
}

impl Default for SnapshotFile {
    fn default() -> Self {
        SnapshotFile {
            version: SNAPSHOT_VERSION,
            checks: HashMap::new(),
            latest_check: HashMap::new(),
            sessions: HashMap::new(),
            meters: HashMap::new(),
            cursors: HashMap::new(),
        }
    }
}

impl SnapshotFile {
    fn compact(&mut self) {
        let mut last_closed: HashMap<&str, &VehicleSession> = HashMap::new();
        for session in self.sessions.values().filter(|s| !s.is_operating()) {
            let newest = last_closed
                .entry(session.vehicle_id.as_str())
                .or_insert(session);
            if session.start_time > newest.start_time {
                *newest = session;
            }
        }
        let keep_sessions: HashSet<String> = last_closed.values().map(|s| s.id.clone()).collect();
        self.sessions
            .retain(|id, s| s.is_operating() || keep_sessions.contains(id));

        let mut keep_checks: HashSet<String> = self.latest_check.values().cloned().collect();
        keep_checks.extend(
            self.sessions
                .values()
                .filter(|s| s.is_operating())
                .map(|s| s.check_id.clone()),
        );
        self.checks.retain(|id, _| keep_checks.contains(id));
    }
}

pub struct LocalSnapshotStore {
    path: PathBuf,
    state: Mutex<SnapshotFile>,
}

impl LocalSnapshotStore {
    /// Opens the snapshot at `path`, starting empty if it is missing or unreadable.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
                context: format!("reading snapshot {}", path.display()),
                source: e,
            })?;
            parse_snapshot(path, &content)
        } else {
            SnapshotFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, SnapshotFile> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `mutate` and persists, committing in memory only after the write.
    fn write<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut SnapshotFile),
    {
        let mut state = self.state();
        let mut next = state.clone();
        mutate(&mut next);
        next.compact();
        persist(&self.path, &next)?;
        *state = next;
        Ok(())
    }
}

fn parse_snapshot(path: &Path, content: &str) -> SnapshotFile {
    if content.trim().is_empty() {
        warn!(path = %path.display(), "Empty snapshot file, starting empty");
        return SnapshotFile::default();
    }

    match serde_json::from_str::<SnapshotFile>(content) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot,
        Ok(snapshot) => {
            warn!(
                path = %path.display(),
                version = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "Unsupported snapshot version, starting empty"
            );
            SnapshotFile::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt snapshot file, starting empty");
            SnapshotFile::default()
        }
    }
}

fn persist(path: &Path, snapshot: &SnapshotFile) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Json {
        context: "serializing snapshot".to_string(),
        source: e,
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::Io {
        context: format!("creating {}", dir.display()),
        source: e,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: e,
    })?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| StoreError::Io {
            context: format!("writing temp file for {}", path.display()),
            source: e,
        })?;
    tmp.flush().map_err(|e| StoreError::Io {
        context: format!("flushing temp file for {}", path.display()),
        source: e,
    })?;
    tmp.persist(path).map_err(|e| StoreError::Io {
        context: format!("persisting snapshot to {}", path.display()),
        source: e.error,
    })?;

    Ok(())
}

impl CheckInstanceStore for LocalSnapshotStore {
    fn get_last(&self, vehicle_id: &str) -> Result<Option<CheckInstance>, StoreError> {
        let state = self.state();
        Ok(state
            .latest_check
            .get(vehicle_id)
            .and_then(|id| state.checks.get(id))
            .cloned())
    }

    fn get(&self, check_id: &str) -> Result<Option<CheckInstance>, StoreError> {
        Ok(self.state().checks.get(check_id).cloned())
    }

    fn save(&self, check: &CheckInstance) -> Result<(), StoreError> {
        self.write(|state| {
            if !state.checks.contains_key(&check.id) {
                state
                    .latest_check
                    .insert(check.vehicle_id.clone(), check.id.clone());
            }
            state.checks.insert(check.id.clone(), check.clone());
        })
    }
}

impl SessionStore for LocalSnapshotStore {
    fn get_active(&self, vehicle_id: &str) -> Result<Option<VehicleSession>, StoreError> {
        Ok(self
            .state()
            .sessions
            .values()
            .filter(|s| s.vehicle_id == vehicle_id && s.is_operating())
            .max_by(|a, b| a.start_time.cmp(&b.start_time))
            .cloned())
    }

    fn get(&self, session_id: &str) -> Result<Option<VehicleSession>, StoreError> {
        Ok(self.state().sessions.get(session_id).cloned())
    }

    fn save(&self, session: &VehicleSession) -> Result<(), StoreError> {
        self.write(|state| {
            state.sessions.insert(session.id.clone(), session.clone());
        })
    }

    fn list_active(
        &self,
        business_id: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<VehicleSession>, StoreError> {
        let mut sessions: Vec<VehicleSession> = self
            .state()
            .sessions
            .values()
            .filter(|s| s.is_operating() && s.business_id == business_id)
            .filter(|s| site_id.map_or(true, |site| s.site_id.as_deref() == Some(site)))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(sessions)
    }
}

impl VehicleMeterStore for LocalSnapshotStore {
    fn get_current(&self, vehicle_id: &str) -> Result<Option<HourMeterReading>, StoreError> {
        Ok(self.state().meters.get(vehicle_id).cloned())
    }

    fn update(&self, vehicle_id: &str, reading: &HourMeterReading) -> Result<(), StoreError> {
        self.write(|state| {
            state.meters.insert(vehicle_id.to_string(), reading.clone());
        })
    }
}

impl RotationCursorStore for LocalSnapshotStore {
    fn load(&self, vehicle_id: &str) -> Result<Option<RotationCursor>, StoreError> {
        Ok(self.state().cursors.get(vehicle_id).cloned())
    }

    fn save(&self, cursor: &RotationCursor) -> Result<(), StoreError> {
        self.write(|state| {
            state
                .cursors
                .insert(cursor.vehicle_id.clone(), cursor.clone());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::types::{SessionStatus, TenantContext};

    fn session(id: &str, vehicle_id: &str, start_time: &str, operating: bool) -> VehicleSession {
        VehicleSession {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            user_id: "u".to_string(),
            business_id: "biz".to_string(),
            site_id: None,
            check_id: format!("check-{id}"),
            start_time: start_time.to_string(),
            end_time: None,
            status: if operating {
                SessionStatus::Operating
            } else {
                SessionStatus::NotOperating
            },
            close_method: None,
            closed_by_admin_id: None,
            initial_hour_meter: None,
            final_hour_meter: None,
            final_meter_warning: None,
        }
    }

    fn reading(value: f64) -> HourMeterReading {
        HourMeterReading {
            value,
            recorded_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = tempdir().unwrap();
        let store = LocalSnapshotStore::open(&temp.path().join("snapshot.json")).unwrap();
        assert!(store.get_current("v").unwrap().is_none());
    }

    #[test]
    fn test_persistence_round_trip() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("snapshot.json");

        {
            let store = LocalSnapshotStore::open(&file).unwrap();
            store.update("v", &reading(42.5)).unwrap();
            RotationCursorStore::save(&store, &RotationCursor::new("v")).unwrap();
        }

        let store = LocalSnapshotStore::open(&file).unwrap();
        assert_eq!(store.get_current("v").unwrap().unwrap().value, 42.5);
        assert!(store.load("v").unwrap().is_some());
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nested").join("snapshot.json");
        let store = LocalSnapshotStore::open(&file).unwrap();
        store.update("v", &reading(1.0)).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn test_empty_file_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("snapshot.json");
        fs::write(&file, "").unwrap();
        let store = LocalSnapshotStore::open(&file).unwrap();
        assert!(store.list_active("biz", None).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("snapshot.json");
        fs::write(&file, "{not json").unwrap();
        let store = LocalSnapshotStore::open(&file).unwrap();
        assert!(store.get_current("v").unwrap().is_none());
    }

    #[test]
    fn test_unsupported_version_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("snapshot.json");
        fs::write(
            &file,
            r#"{"version":99,"meters":{"v":{"value":5.0,"recorded_at":"x"}}}"#,
        )
        .unwrap();
        let store = LocalSnapshotStore::open(&file).unwrap();
        assert!(store.get_current("v").unwrap().is_none());
    }

    #[test]
    fn test_compaction_keeps_latest_check_and_last_closed_session() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("snapshot.json");
        let store = LocalSnapshotStore::open(&file).unwrap();
        let now = chrono::Utc::now();
        let context = TenantContext::new("biz");

        let old = CheckInstance::create(&context, "v", "u", vec![], None, now);
        let newest = CheckInstance::create(&context, "v", "u", vec![], None, now);
        CheckInstanceStore::save(&store, &old).unwrap();
        CheckInstanceStore::save(&store, &newest).unwrap();

        SessionStore::save(&store, &session("s1", "v", "2026-01-01T06:00:00.000Z", false)).unwrap();
        SessionStore::save(&store, &session("s2", "v", "2026-01-02T06:00:00.000Z", false)).unwrap();
        SessionStore::save(&store, &session("s3", "v", "2026-01-03T06:00:00.000Z", true)).unwrap();

        let reopened = LocalSnapshotStore::open(&file).unwrap();
        assert!(CheckInstanceStore::get(&reopened, &old.id).unwrap().is_none());
        assert_eq!(reopened.get_last("v").unwrap().unwrap().id, newest.id);
        assert!(SessionStore::get(&reopened, "s1").unwrap().is_none());
        assert!(SessionStore::get(&reopened, "s2").unwrap().is_some());
        assert_eq!(reopened.get_active("v").unwrap().unwrap().id, "s3");
    }

    #[test]
    fn test_compaction_keeps_check_of_operating_session() {
        let temp = tempdir().unwrap();
        let store = LocalSnapshotStore::open(&temp.path().join("snapshot.json")).unwrap();
        let now = chrono::Utc::now();
        let context = TenantContext::new("biz");

        let gate = CheckInstance::create(&context, "v", "u", vec![], None, now);
        CheckInstanceStore::save(&store, &gate).unwrap();
        let mut operating = session("s1", "v", "2026-01-01T06:00:00.000Z", true);
        operating.check_id = gate.id.clone();
        SessionStore::save(&store, &operating).unwrap();

        let next = CheckInstance::create(&context, "v", "u", vec![], None, now);
        CheckInstanceStore::save(&store, &next).unwrap();

        assert!(CheckInstanceStore::get(&store, &gate.id).unwrap().is_some());
        assert_eq!(store.get_last("v").unwrap().unwrap().id, next.id);
    }
}
