//! Vehicle status derivation.
//!
//! Status is never stored. It is recomputed from two facts:
//!
//! 1. An OPERATING session for the vehicle → `IN_USE`, regardless of check history.
//! 2. Otherwise the most recent check's status:
//!
//! | last check                                   | status           |
//! |----------------------------------------------|------------------|
//! | `COMPLETED_FAIL`                             | `OUT_OF_SERVICE` |
//! | `COMPLETED_PASS`, `IN_PROGRESS`, `EXPIRED`   | `AVAILABLE`      |
//! | `PENDING`, `OVERDUE`                         | `AVAILABLE`      |
//! | none on file                                 | per [`MissingCheckPolicy`] |

use crate::config::MissingCheckPolicy;
use crate::types::{CheckInstance, CheckStatus, VehicleSession, VehicleStatus, VehicleStatusReport};

/// Derives the status from the active session and the last check.
pub fn resolve_vehicle_status(
    active_session: Option<&VehicleSession>,
    last_check: Option<&CheckInstance>,
    missing_check: MissingCheckPolicy,
) -> VehicleStatus {
    if active_session.is_some_and(VehicleSession::is_operating) {
        return VehicleStatus::InUse;
    }

    match last_check.map(|check| check.status) {
        Some(CheckStatus::CompletedFail) => VehicleStatus::OutOfService,
        Some(
            CheckStatus::CompletedPass
            | CheckStatus::InProgress
            | CheckStatus::Expired
            | CheckStatus::Pending
            | CheckStatus::Overdue,
        ) => VehicleStatus::Available,
        None => match missing_check {
            MissingCheckPolicy::Available => VehicleStatus::Available,
            MissingCheckPolicy::Unknown => VehicleStatus::Unknown,
        },
    }
}

impl VehicleStatus {
    pub fn is_available(&self) -> bool {
        *self == VehicleStatus::Available
    }

    /// Operator-facing reason a vehicle cannot be used; empty when available.
    pub fn error_message(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "",
            VehicleStatus::InUse => "Vehicle is currently in use by another operator",
            VehicleStatus::OutOfService => {
                "Vehicle is out of service: the last pre-shift check failed a critical item"
            }
            VehicleStatus::Unknown => "Vehicle status is unknown: no pre-shift check on file",
        }
    }
}

/// Builds the full report for presentation and session gating.
pub fn vehicle_status_report(
    vehicle_id: &str,
    active_session: Option<&VehicleSession>,
    last_check: Option<&CheckInstance>,
    missing_check: MissingCheckPolicy,
) -> VehicleStatusReport {
    let status = resolve_vehicle_status(active_session, last_check, missing_check);
    VehicleStatusReport {
        vehicle_id: vehicle_id.to_string(),
        status,
        is_available: status.is_available(),
        error_message: status.error_message().to_string(),
        active_session_id: active_session
            .filter(|s| s.is_operating())
            .map(|s| s.id.clone()),
        last_check_id: last_check.map(|c| c.id.clone()),
    }
}
