//! Session lifecycle: the guarded `NOT_OPERATING ⟷ OPERATING` transitions.
//!
//! Every transition runs under the vehicle's lock from [`VehicleLocks`], and
//! re-reads the session and check state after acquiring it. Two starts for the
//! same vehicle therefore serialize, and the second one observes the first
//! one's OPERATING session.
//!
//! Start guards, in order:
//!
//! 1. No OPERATING session on the vehicle (`SessionAlreadyActive`)
//! 2. Derived vehicle status is AVAILABLE (`VehicleUnavailable`)
//! 3. With `require_passed_check`: the check is the vehicle's latest one and
//!    allows a session (`CheckNotFound`, `ChecklistNotPassed`)
//! 4. Initial hour meter, if given, passes the initial-reading policy

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::{age_secs, to_rfc3339};
use crate::config::{EngineConfig, FinalMeterPolicy};
use crate::error::SessionError;
use crate::hour_meter::validate_with_policy;
use crate::locks::{lock, VehicleLocks};
use crate::stores::{CheckInstanceStore, SessionStore, VehicleMeterStore};
use crate::types::{
    CloseMethod, HourMeterReading, MeterPolicy, SessionStatus, TenantContext, VehicleSession,
    VehicleStatusReport,
};
use crate::vehicle_status::vehicle_status_report;

type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct StartSessionRequest {
    pub context: TenantContext,
    pub vehicle_id: String,
    pub user_id: String,
    pub check_id: String,
    pub initial_hour_meter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct EndSessionRequest {
    pub session_id: String,
    pub close_method: CloseMethod,
    pub admin_id: Option<String>,
    pub final_hour_meter: Option<String>,
}

pub struct SessionLifecycleController {
    sessions: Arc<dyn SessionStore>,
    checks: Arc<dyn CheckInstanceStore>,
    meters: Arc<dyn VehicleMeterStore>,
    locks: Arc<VehicleLocks>,
    config: EngineConfig,
}

impl SessionLifecycleController {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        checks: Arc<dyn CheckInstanceStore>,
        meters: Arc<dyn VehicleMeterStore>,
        locks: Arc<VehicleLocks>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions,
            checks,
            meters,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current derived status of a vehicle.
    pub fn vehicle_status(&self, vehicle_id: &str) -> SessionResult<VehicleStatusReport> {
        let active = self.sessions.get_active(vehicle_id)?;
        let last_check = self.checks.get_last(vehicle_id)?;
        Ok(vehicle_status_report(
            vehicle_id,
            active.as_ref(),
            last_check.as_ref(),
            self.config.missing_check_policy,
        ))
    }

    pub fn start_session(
        &self,
        request: StartSessionRequest,
        now: DateTime<Utc>,
    ) -> SessionResult<VehicleSession> {
        let handle = self.locks.handle(&request.vehicle_id);
        let _guard = lock(&handle);

        let active = self.sessions.get_active(&request.vehicle_id)?;
        if let Some(active) = active.as_ref().filter(|s| s.is_operating()) {
            return Err(SessionError::SessionAlreadyActive {
                vehicle_id: request.vehicle_id.clone(),
                session_id: active.id.clone(),
            });
        }

        let last_check = self.checks.get_last(&request.vehicle_id)?;
        let report = vehicle_status_report(
            &request.vehicle_id,
            active.as_ref(),
            last_check.as_ref(),
            self.config.missing_check_policy,
        );
        if !report.is_available {
            return Err(SessionError::VehicleUnavailable {
                status: report.status,
                reason: report.error_message,
            });
        }

        if self.config.require_passed_check {
            let check = last_check
                .filter(|c| c.id == request.check_id)
                .ok_or_else(|| SessionError::CheckNotFound {
                    check_id: request.check_id.clone(),
                    vehicle_id: request.vehicle_id.clone(),
                })?;
            if !check.allows_session_start() {
                return Err(SessionError::ChecklistNotPassed {
                    check_id: check.id,
                    status: check.status,
                });
            }
        }

        let initial_hour_meter = match request.initial_hour_meter.as_deref() {
            Some(raw) => {
                let current = self.meters.get_current(&request.vehicle_id)?;
                Some(validate_with_policy(
                    raw,
                    current.map(|r| r.value),
                    MeterPolicy::InitialReading,
                )?)
            }
            None => None,
        };

        let session = VehicleSession {
            id: ulid::Ulid::new().to_string(),
            vehicle_id: request.vehicle_id.clone(),
            user_id: request.user_id,
            business_id: request.context.business_id,
            site_id: request.context.site_id,
            check_id: request.check_id,
            start_time: to_rfc3339(now),
            end_time: None,
            status: SessionStatus::Operating,
            close_method: None,
            closed_by_admin_id: None,
            initial_hour_meter,
            final_hour_meter: None,
            final_meter_warning: None,
        };
        // Meter before session: if the session write fails, the vehicle is
        // still startable and the retried reading still passes (equal allowed).
        if let Some(value) = initial_hour_meter {
            self.meters.update(
                &session.vehicle_id,
                &HourMeterReading {
                    value,
                    recorded_at: session.start_time.clone(),
                },
            )?;
        }
        self.sessions.save(&session)?;

        info!(
            vehicle_id = %session.vehicle_id,
            session_id = %session.id,
            user_id = %session.user_id,
            check_id = %session.check_id,
            "Session started"
        );
        Ok(session)
    }

    pub fn end_session(
        &self,
        request: EndSessionRequest,
        now: DateTime<Utc>,
    ) -> SessionResult<VehicleSession> {
        let vehicle_id = self
            .sessions
            .get(&request.session_id)?
            .ok_or_else(|| SessionError::SessionNotFound(request.session_id.clone()))?
            .vehicle_id;
        let handle = self.locks.handle(&vehicle_id);
        let _guard = lock(&handle);

        let mut session = self
            .sessions
            .get(&request.session_id)?
            .ok_or_else(|| SessionError::SessionNotFound(request.session_id.clone()))?;
        if !session.is_operating() {
            return Err(SessionError::SessionNotActive(session.id));
        }

        let mut final_hour_meter = None;
        if let Some(raw) = request.final_hour_meter.as_deref() {
            let baseline = match session.initial_hour_meter {
                Some(initial) => Some(initial),
                None => self.meters.get_current(&vehicle_id)?.map(|r| r.value),
            };
            match validate_with_policy(raw, baseline, MeterPolicy::FinalReading) {
                Ok(value) => final_hour_meter = Some(value),
                Err(err) => match self.config.final_meter_policy {
                    FinalMeterPolicy::Reject => return Err(err.into()),
                    FinalMeterPolicy::Warn => {
                        warn!(
                            session_id = %session.id,
                            reading = %raw,
                            error = %err,
                            "Final hour meter rejected, closing session without it"
                        );
                        session.final_meter_warning = Some(err.to_string());
                    }
                },
            }
        }

        let admin_id = request
            .admin_id
            .filter(|id| !id.trim().is_empty());
        if request.close_method == CloseMethod::AdminClosed && admin_id.is_none() {
            return Err(SessionError::MissingAdminId);
        }

        session.end_time = Some(to_rfc3339(now));
        session.status = SessionStatus::NotOperating;
        session.close_method = Some(request.close_method);
        session.closed_by_admin_id = admin_id;
        session.final_hour_meter = final_hour_meter;

        // The final reading is checked against the session's own initial
        // reading, so a retry after a failed session write is still accepted.
        if let Some(value) = final_hour_meter {
            self.meters.update(
                &vehicle_id,
                &HourMeterReading {
                    value,
                    recorded_at: to_rfc3339(now),
                },
            )?;
        }
        self.sessions.save(&session)?;

        info!(
            vehicle_id = %session.vehicle_id,
            session_id = %session.id,
            close_method = ?request.close_method,
            "Session ended"
        );
        Ok(session)
    }

    pub fn list_active_sessions(
        &self,
        business_id: &str,
        site_id: Option<&str>,
    ) -> SessionResult<Vec<VehicleSession>> {
        Ok(self.sessions.list_active(business_id, site_id)?)
    }

    /// Closes OPERATING sessions that started more than `max_session_hours` ago.
    ///
    /// Sessions with an unparsable start time are left alone.
    pub fn close_timed_out_sessions(
        &self,
        context: &TenantContext,
        now: DateTime<Utc>,
    ) -> SessionResult<Vec<VehicleSession>> {
        let limit = self.config.max_session_duration().num_seconds();
        let candidates = self
            .sessions
            .list_active(&context.business_id, context.site_id.as_deref())?;

        let mut closed = Vec::new();
        for candidate in candidates {
            if !age_secs(&candidate.start_time, now).is_some_and(|age| age > limit) {
                continue;
            }

            let handle = self.locks.handle(&candidate.vehicle_id);
            let _guard = lock(&handle);
            let Some(mut session) = self.sessions.get(&candidate.id)? else {
                continue;
            };
            if !session.is_operating() {
                continue;
            }

            session.end_time = Some(to_rfc3339(now));
            session.status = SessionStatus::NotOperating;
            session.close_method = Some(CloseMethod::TimeoutClosed);
            self.sessions.save(&session)?;

            info!(
                vehicle_id = %session.vehicle_id,
                session_id = %session.id,
                "Session closed after timeout"
            );
            closed.push(session);
        }
        Ok(closed)
    }

    /// Administrator edit of a vehicle's meter; must strictly increase.
    pub fn update_vehicle_meter(
        &self,
        vehicle_id: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<HourMeterReading> {
        let handle = self.locks.handle(vehicle_id);
        let _guard = lock(&handle);

        let current = self.meters.get_current(vehicle_id)?;
        let accepted = validate_with_policy(
            value,
            current.map(|r| r.value),
            MeterPolicy::ManualUpdate,
        )?;
        let reading = HourMeterReading {
            value: accepted,
            recorded_at: to_rfc3339(now),
        };
        self.meters.update(vehicle_id, &reading)?;

        info!(vehicle_id = %vehicle_id, value = accepted, "Vehicle meter updated");
        Ok(reading)
    }
}
