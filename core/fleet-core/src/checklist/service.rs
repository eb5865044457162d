//! Check creation and answering against the collaborator stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::rotation::select_rotated;
use crate::config::EngineConfig;
use crate::error::{ChecklistError, Result};
use crate::locks::{lock, VehicleLocks};
use crate::stores::{CheckInstanceStore, QuestionBankRepository, RotationCursorStore};
use crate::types::{
    Answer, CheckInstance, ChecklistEvaluation, GeoPoint, RotationCursor, RotationRules,
    TenantContext, VehicleProfile,
};

pub struct ChecklistService {
    bank: Arc<dyn QuestionBankRepository>,
    checks: Arc<dyn CheckInstanceStore>,
    cursors: Arc<dyn RotationCursorStore>,
    locks: Arc<VehicleLocks>,
}

impl ChecklistService {
    pub fn new(
        bank: Arc<dyn QuestionBankRepository>,
        checks: Arc<dyn CheckInstanceStore>,
        cursors: Arc<dyn RotationCursorStore>,
        locks: Arc<VehicleLocks>,
    ) -> Self {
        Self {
            bank,
            checks,
            cursors,
            locks,
        }
    }

    /// Creates a PENDING, unanswered check with today's rotated questions.
    ///
    /// The cursor read, selection and cursor write run under the vehicle lock,
    /// so two concurrent creations never select from the same position.
    pub fn select_rotated_checklist(
        &self,
        context: &TenantContext,
        vehicle: &VehicleProfile,
        user_id: &str,
        rules: &RotationRules,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> Result<CheckInstance> {
        let handle = self.locks.handle(&vehicle.vehicle_id);
        let _guard = lock(&handle);

        let cursor = self
            .cursors
            .load(&vehicle.vehicle_id)?
            .unwrap_or_else(|| RotationCursor::new(vehicle.vehicle_id.clone()));

        let bank = self.bank.get_items(
            &context.business_id,
            &vehicle.vehicle_type,
            vehicle.energy_source,
        )?;
        let selection = select_rotated(&bank, vehicle, rules, &cursor)?;

        let check = CheckInstance::create(
            context,
            &vehicle.vehicle_id,
            user_id,
            selection.questions,
            location,
            now,
        );
        self.checks.save(&check)?;
        self.cursors.save(&selection.next_cursor)?;

        info!(
            vehicle_id = %vehicle.vehicle_id,
            check_id = %check.id,
            questions = check.items.len(),
            cursor = selection.next_cursor.position,
            "Created pre-shift check"
        );
        Ok(check)
    }

    pub fn get_check(&self, check_id: &str) -> Result<CheckInstance> {
        self.checks
            .get(check_id)?
            .ok_or_else(|| ChecklistError::CheckNotFound(check_id.to_string()).into())
    }

    /// Records one answer and persists the check.
    pub fn record_answer(
        &self,
        check_id: &str,
        item_id: &str,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<ChecklistEvaluation> {
        let vehicle_id = self.get_check(check_id)?.vehicle_id;
        let handle = self.locks.handle(&vehicle_id);
        let _guard = lock(&handle);

        // Re-read under the lock; another answer may have landed meanwhile.
        let mut check = self.get_check(check_id)?;
        let evaluation = check.record_answer(item_id, answer, now)?;
        self.checks.save(&check)?;

        debug!(
            check_id = %check.id,
            item_id = %item_id,
            status = %evaluation.status,
            answered = evaluation.answered_count,
            total = evaluation.total_count,
            "Recorded answer"
        );
        Ok(evaluation)
    }

    /// Applies the overdue/expiry windows to a stored check, saving it if its status moved.
    pub fn refresh_deadlines(
        &self,
        check_id: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<CheckInstance> {
        let vehicle_id = self.get_check(check_id)?.vehicle_id;
        let handle = self.locks.handle(&vehicle_id);
        let _guard = lock(&handle);

        let mut check = self.get_check(check_id)?;
        if check.refresh_deadlines(now, config.pending_overdue(), config.in_progress_expiry()) {
            self.checks.save(&check)?;
            info!(check_id = %check.id, status = %check.status, "Check deadline reached");
        }
        Ok(check)
    }
}
