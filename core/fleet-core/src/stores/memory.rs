//! In-memory store for tests and ephemeral clients.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::types::{CheckInstance, HourMeterReading, RotationCursor, VehicleSession};

use super::{CheckInstanceStore, RotationCursorStore, SessionStore, VehicleMeterStore};

#[derive(Default)]
struct MemoryState {
    checks: HashMap<String, CheckInstance>,
    /// vehicle id → id of the most recently inserted check
    latest_check: HashMap<String, String>,
    sessions: HashMap<String, VehicleSession>,
    meters: HashMap<String, HourMeterReading>,
    cursors: HashMap<String, RotationCursor>,
}

/// Implements every mutable collaborator store over process memory.
#[derive(Default)]
pub struct InMemoryStores {
    state: Mutex<MemoryState>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // Recover from poisoning - the maps stay structurally valid
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CheckInstanceStore for InMemoryStores {
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
        let mut state = self.state();
        if !state.checks.contains_key(&check.id) {
            state
                .latest_check
                .insert(check.vehicle_id.clone(), check.id.clone());
        }
        state.checks.insert(check.id.clone(), check.clone());
        Ok(())
    }
}

impl SessionStore for InMemoryStores {
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
        self.state()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
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

impl VehicleMeterStore for InMemoryStores {
    fn get_current(&self, vehicle_id: &str) -> Result<Option<HourMeterReading>, StoreError> {
        Ok(self.state().meters.get(vehicle_id).cloned())
    }

    fn update(&self, vehicle_id: &str, reading: &HourMeterReading) -> Result<(), StoreError> {
        self.state()
            .meters
            .insert(vehicle_id.to_string(), reading.clone());
        Ok(())
    }
}

impl RotationCursorStore for InMemoryStores {
    fn load(&self, vehicle_id: &str) -> Result<Option<RotationCursor>, StoreError> {
        Ok(self.state().cursors.get(vehicle_id).cloned())
    }

    fn save(&self, cursor: &RotationCursor) -> Result<(), StoreError> {
        self.state()
            .cursors
            .insert(cursor.vehicle_id.clone(), cursor.clone());
        Ok(())
    }
}
