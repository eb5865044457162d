//! # fleet-core
//!
//! Vehicle Operational State Engine for fleet-safety clients: pre-shift
//! checklist rotation and evaluation, hour-meter validation, derived vehicle
//! status and the guarded session lifecycle.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Network collaborators sit behind
//!   the traits in [`stores`]; clients await them outside the core.
//! - **Serialized per vehicle**: Session transitions and rotation-cursor updates
//!   take a per-vehicle lock, so at most one session per vehicle is ever OPERATING.
//! - **Graceful degradation in display paths**: meter formatting never fails, while
//!   meter validation hard-rejects bad input.
//! - **One canonical type per entity**: transport DTOs are mapped at the client edge.
//! - **FFI-ready**: UniFFI annotations enable Kotlin and Swift bindings.
//!   Prefer additive public API changes; removing or renaming breaks FFI clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fleet_core::{FleetEngine, EngineConfig};
//!
//! let engine = FleetEngine::in_memory(EngineConfig::default());
//! engine.load_question_bank("biz-1".into(), bank);
//! let check = engine.select_rotated_checklist(context, vehicle, user_id, rules, None)?;
//! ```

// UniFFI scaffolding for Kotlin/Swift bindings
uniffi::setup_scaffolding!();

pub mod checklist;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hour_meter;
pub mod locks;
pub mod session;
pub mod storage;
pub mod stores;
pub mod types;
pub mod vehicle_status;

// Re-export commonly used items at crate root
pub use checklist::{applies_to, evaluate, select_rotated, ChecklistService, RotationSelection};
pub use config::*;
pub use engine::{evaluate_check_items, validate_hour_meter, FleetEngine};
pub use error::{
    ChecklistError, FleetError, FleetFfiError, HourMeterError, Result, RotationError,
    SessionError, StoreError,
};
pub use locks::VehicleLocks;
pub use session::{EndSessionRequest, SessionLifecycleController, StartSessionRequest};
pub use storage::*;
pub use stores::{
    CheckInstanceStore, InMemoryStores, LocalSnapshotStore, QuestionBankCatalog,
    QuestionBankRepository, RotationCursorStore, SessionStore, VehicleMeterStore,
};
pub use types::*;
pub use vehicle_status::{resolve_vehicle_status, vehicle_status_report};
