//! Collaborator interfaces the engine reads and writes through.
//!
//! Transport (REST, local DB) lives behind these traits. The engine only ever
//! sees canonical domain types.
//!
//! Implementors should:
//! - Return `Ok(None)` for "not found"; reserve errors for an unreachable backend
//! - Be safe to call from several threads (`Send + Sync`)
//! - Not hold their own locks across calls; the engine serializes per vehicle

mod catalog;
mod memory;
mod snapshot;

pub use catalog::QuestionBankCatalog;
pub use memory::InMemoryStores;
pub use snapshot::LocalSnapshotStore;

use crate::error::StoreError;
use crate::types::{
    CheckInstance, EnergySource, HourMeterReading, QuestionBankItem, RotationCursor,
    VehicleSession,
};

/// Master question bank for a business.
pub trait QuestionBankRepository: Send + Sync {
    fn get_items(
        &self,
        business_id: &str,
        vehicle_type: &str,
        energy_source: EnergySource,
    ) -> Result<Vec<QuestionBankItem>, StoreError>;
}

pub trait CheckInstanceStore: Send + Sync {
    /// Most recently created check for the vehicle.
    fn get_last(&self, vehicle_id: &str) -> Result<Option<CheckInstance>, StoreError>;

    fn get(&self, check_id: &str) -> Result<Option<CheckInstance>, StoreError>;

    /// Inserts or replaces by id.
    fn save(&self, check: &CheckInstance) -> Result<(), StoreError>;
}

pub trait SessionStore: Send + Sync {
    /// The OPERATING session for the vehicle, if any.
    fn get_active(&self, vehicle_id: &str) -> Result<Option<VehicleSession>, StoreError>;

    fn get(&self, session_id: &str) -> Result<Option<VehicleSession>, StoreError>;

    /// Inserts or replaces by id.
    fn save(&self, session: &VehicleSession) -> Result<(), StoreError>;

    /// OPERATING sessions for a business, optionally narrowed to one site.
    fn list_active(
        &self,
        business_id: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<VehicleSession>, StoreError>;
}

pub trait VehicleMeterStore: Send + Sync {
    fn get_current(&self, vehicle_id: &str) -> Result<Option<HourMeterReading>, StoreError>;

    fn update(&self, vehicle_id: &str, reading: &HourMeterReading) -> Result<(), StoreError>;
}

pub trait RotationCursorStore: Send + Sync {
    /// `None` for a vehicle that has never had a check.
    fn load(&self, vehicle_id: &str) -> Result<Option<RotationCursor>, StoreError>;

    fn save(&self, cursor: &RotationCursor) -> Result<(), StoreError>;
}
