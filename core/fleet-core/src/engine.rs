//! FleetEngine - the main entry point for fleet-safety clients.
//!
//! The engine bundles the checklist service and the session lifecycle
//! controller over one set of collaborator stores. It is:
//! - **Synchronous**: No async runtime required
//! - **Thread-safe**: Transitions serialize per vehicle internally
//! - **Stable**: Prefer additive API changes to avoid breaking FFI clients
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use fleet_core::{FleetEngine, StartSessionRequest, TenantContext};
//!
//! let engine = FleetEngine::new(String::new()).expect("Failed to initialize");
//! let status = engine.get_vehicle_status("forklift-7".into())?;
//! if status.is_available {
//!     engine.start_session(request)?;
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::checklist::{evaluate, ChecklistService};
use crate::config::{load_engine_config, EngineConfig};
use crate::error::{FleetError, FleetFfiError};
use crate::hour_meter;
use crate::locks::VehicleLocks;
use crate::session::{EndSessionRequest, SessionLifecycleController, StartSessionRequest};
use crate::storage::StorageConfig;
use crate::stores::{
    CheckInstanceStore, InMemoryStores, LocalSnapshotStore, QuestionBankCatalog,
    RotationCursorStore, SessionStore, VehicleMeterStore,
};
use crate::types::{
    Answer, CheckInstance, CheckItem, ChecklistEvaluation, GeoPoint, HourMeterReading,
    MeterPolicy, QuestionBankItem, RotationRules, TenantContext, VehicleProfile, VehicleSession,
    VehicleStatusReport,
};

/// The main engine for fleet-safety operations.
///
/// This is the primary FFI interface for Kotlin/Swift clients.
#[derive(uniffi::Object)]
pub struct FleetEngine {
    storage: StorageConfig,
    catalog: Arc<QuestionBankCatalog>,
    checklists: ChecklistService,
    sessions: SessionLifecycleController,
}

impl FleetEngine {
    /// Wires the engine over caller-provided stores.
    ///
    /// Not exposed to FFI. Used by tests and by hosts that bridge their own backend.
    pub fn with_stores<S>(
        storage: StorageConfig,
        catalog: Arc<QuestionBankCatalog>,
        stores: Arc<S>,
        config: EngineConfig,
    ) -> Self
    where
        S: CheckInstanceStore + SessionStore + VehicleMeterStore + RotationCursorStore + 'static,
    {
        let locks = Arc::new(VehicleLocks::new());
        let checklists = ChecklistService::new(
            catalog.clone(),
            stores.clone(),
            stores.clone(),
            locks.clone(),
        );
        let sessions =
            SessionLifecycleController::new(stores.clone(), stores.clone(), stores, locks, config);

        Self {
            storage,
            catalog,
            checklists,
            sessions,
        }
    }

    /// Creates an engine backed by the snapshot file and config under `storage`.
    ///
    /// Not exposed to FFI - use `new()` for external clients.
    pub fn with_storage(storage: StorageConfig) -> Result<Self, FleetFfiError> {
        let config = load_engine_config(&storage);
        let snapshot = Arc::new(LocalSnapshotStore::open(&storage.snapshot_file())?);
        Ok(Self::with_stores(
            storage,
            Arc::new(QuestionBankCatalog::new()),
            snapshot,
            config,
        ))
    }

    /// Creates an engine that keeps everything in memory.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_stores(
            StorageConfig::default(),
            Arc::new(QuestionBankCatalog::new()),
            Arc::new(InMemoryStores::new()),
            config,
        )
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn checklists(&self) -> &ChecklistService {
        &self.checklists
    }

    pub fn sessions(&self) -> &SessionLifecycleController {
        &self.sessions
    }
}

#[uniffi::export]
impl FleetEngine {
    /// Creates an engine rooted at `root_dir`, or the platform data dir when empty.
    #[uniffi::constructor]
    pub fn new(root_dir: String) -> Result<Self, FleetFfiError> {
        let storage = if root_dir.trim().is_empty() {
            StorageConfig::default()
        } else {
            StorageConfig::with_root(PathBuf::from(root_dir))
        };
        Self::with_storage(storage)
    }

    pub fn get_config(&self) -> EngineConfig {
        self.sessions.config().clone()
    }

    /// Absolute path of the storage root.
    pub fn storage_dir(&self) -> String {
        self.storage.root().to_string_lossy().to_string()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Checklists API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Replaces the question bank for a business. Returns the item count.
    pub fn load_question_bank(&self, business_id: String, items: Vec<QuestionBankItem>) -> u32 {
        self.catalog.load(&business_id, items)
    }

    /// Creates today's PENDING check for a vehicle and advances its rotation cursor.
    pub fn select_rotated_checklist(
        &self,
        context: TenantContext,
        vehicle: VehicleProfile,
        user_id: String,
        rules: RotationRules,
        location: Option<GeoPoint>,
    ) -> Result<CheckInstance, FleetFfiError> {
        if !self.catalog.has_business(&context.business_id) {
            return Err(FleetError::QuestionBankMissing(context.business_id).into());
        }
        Ok(self.checklists.select_rotated_checklist(
            &context,
            &vehicle,
            &user_id,
            &rules,
            location,
            Utc::now(),
        )?)
    }

    pub fn get_check(&self, check_id: String) -> Result<CheckInstance, FleetFfiError> {
        Ok(self.checklists.get_check(&check_id)?)
    }

    pub fn record_answer(
        &self,
        check_id: String,
        item_id: String,
        answer: Answer,
    ) -> Result<ChecklistEvaluation, FleetFfiError> {
        Ok(self
            .checklists
            .record_answer(&check_id, &item_id, answer, Utc::now())?)
    }

    pub fn evaluate_checklist(&self, check_id: String) -> Result<ChecklistEvaluation, FleetFfiError> {
        Ok(self.checklists.get_check(&check_id)?.evaluate())
    }

    /// Applies the configured overdue/expiry windows to a stored check.
    pub fn refresh_check_deadlines(&self, check_id: String) -> Result<CheckInstance, FleetFfiError> {
        Ok(self
            .checklists
            .refresh_deadlines(&check_id, self.sessions.config(), Utc::now())?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Hour Meter API
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn validate_hour_meter(
        &self,
        new_value: String,
        current_value: String,
        policy: MeterPolicy,
    ) -> Result<f64, FleetFfiError> {
        validate_hour_meter(new_value, current_value, policy)
    }

    /// `final - initial`, or `None` when either side does not parse or final < initial.
    pub fn hour_meter_difference(&self, final_value: String, initial_value: String) -> Option<f64> {
        hour_meter::difference(&final_value, &initial_value)
    }

    /// Display form of a reading; returns the input unchanged when it does not parse.
    pub fn format_hour_meter(&self, value: String) -> String {
        hour_meter::format_reading(&value, self.sessions.config().meter_display_decimals)
    }

    pub fn update_vehicle_meter(
        &self,
        vehicle_id: String,
        value: String,
    ) -> Result<HourMeterReading, FleetFfiError> {
        Ok(self
            .sessions
            .update_vehicle_meter(&vehicle_id, &value, Utc::now())?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Vehicle & Session API
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn get_vehicle_status(&self, vehicle_id: String) -> Result<VehicleStatusReport, FleetFfiError> {
        Ok(self.sessions.vehicle_status(&vehicle_id)?)
    }

    pub fn start_session(&self, request: StartSessionRequest) -> Result<VehicleSession, FleetFfiError> {
        Ok(self.sessions.start_session(request, Utc::now())?)
    }

    pub fn end_session(&self, request: EndSessionRequest) -> Result<VehicleSession, FleetFfiError> {
        Ok(self.sessions.end_session(request, Utc::now())?)
    }

    /// OPERATING sessions for a business, optionally narrowed to one site.
    pub fn list_active_sessions(
        &self,
        business_id: String,
        site_id: Option<String>,
    ) -> Result<Vec<VehicleSession>, FleetFfiError> {
        Ok(self
            .sessions
            .list_active_sessions(&business_id, site_id.as_deref())?)
    }

    /// Closes sessions older than `max_session_hours` as TIMEOUT_CLOSED.
    pub fn close_timed_out_sessions(
        &self,
        context: TenantContext,
    ) -> Result<Vec<VehicleSession>, FleetFfiError> {
        Ok(self.sessions.close_timed_out_sessions(&context, Utc::now())?)
    }
}

/// Validates a meter reading against the current value under a named policy.
#[uniffi::export]
pub fn validate_hour_meter(
    new_value: String,
    current_value: String,
    policy: MeterPolicy,
) -> Result<f64, FleetFfiError> {
    Ok(hour_meter::validate(
        &new_value,
        &current_value,
        policy.allow_equal(),
    )?)
}

/// Evaluates an item list without touching any store.
#[uniffi::export]
pub fn evaluate_check_items(items: Vec<CheckItem>) -> ChecklistEvaluation {
    evaluate(&items)
}
