//! Check instance lifecycle: creation, answers, deadlines.
//!
//! ```text
//! PENDING ──answer──▶ IN_PROGRESS ──complete──▶ COMPLETED_PASS
//!    │                     │  └──critical fail──▶ COMPLETED_FAIL
//!    └─overdue─▶ OVERDUE ──┴──expiry window──▶ EXPIRED
//! ```
//!
//! Terminal checks (`COMPLETED_*`, `EXPIRED`) are immutable.

use chrono::{DateTime, Duration, Utc};

use super::evaluation::evaluate;
use crate::clock::{age_secs, to_rfc3339};
use crate::error::ChecklistError;
use crate::types::{
    Answer, CheckInstance, CheckItem, CheckStatus, ChecklistEvaluation, GeoPoint,
    QuestionBankItem, TenantContext,
};

impl CheckInstance {
    /// Creates an unanswered PENDING check over the selected questions.
    pub fn create(
        context: &TenantContext,
        vehicle_id: &str,
        user_id: &str,
        questions: Vec<QuestionBankItem>,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            vehicle_id: vehicle_id.to_string(),
            user_id: user_id.to_string(),
            business_id: context.business_id.clone(),
            site_id: context.site_id.clone(),
            items: questions.into_iter().map(CheckItem::unanswered).collect(),
            status: CheckStatus::Pending,
            start_time: to_rfc3339(now),
            end_time: None,
            location,
        }
    }

    pub fn evaluate(&self) -> ChecklistEvaluation {
        evaluate(&self.items)
    }

    /// Whether a session may start from this check in its current state.
    pub fn allows_session_start(&self) -> bool {
        !matches!(self.status, CheckStatus::Expired) && self.evaluate().can_start_session
    }

    /// Applies one answer and re-derives the status.
    pub fn record_answer(
        &mut self,
        item_id: &str,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<ChecklistEvaluation, ChecklistError> {
        if self.status.is_terminal() {
            return Err(ChecklistError::CheckClosed {
                check_id: self.id.clone(),
                status: self.status,
            });
        }

        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.question.id == item_id)
        else {
            return Err(ChecklistError::UnknownItem {
                check_id: self.id.clone(),
                item_id: item_id.to_string(),
            });
        };
        item.user_answer = Some(answer);
        item.answered_at = Some(to_rfc3339(now));

        let evaluation = self.evaluate();
        self.status = evaluation.status;
        if self.status.is_terminal() {
            self.end_time = Some(to_rfc3339(now));
        }
        Ok(evaluation)
    }

    /// Applies the overdue and expiry windows. Returns true if the status changed.
    ///
    /// Ages are measured from `start_time`; a malformed timestamp leaves the check as is.
    pub fn refresh_deadlines(
        &mut self,
        now: DateTime<Utc>,
        pending_overdue: Duration,
        in_progress_expiry: Duration,
    ) -> bool {
        let Some(age) = age_secs(&self.start_time, now) else {
            return false;
        };
        let before = self.status;

        if self.status == CheckStatus::Pending && age > pending_overdue.num_seconds() {
            self.status = CheckStatus::Overdue;
        }
        if matches!(self.status, CheckStatus::InProgress | CheckStatus::Overdue)
            && age > in_progress_expiry.num_seconds()
        {
            self.status = CheckStatus::Expired;
            self.end_time = Some(to_rfc3339(now));
        }

        before != self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Criticality;

    fn question(id: &str, criticality: Criticality) -> QuestionBankItem {
        QuestionBankItem {
            id: id.to_string(),
            category: "General".to_string(),
            sub_category: None,
            energy_sources: vec![],
            vehicle_types: vec![],
            component: None,
            question: "OK?".to_string(),
            criticality,
            expected_answer: Answer::Pass,
            rotation_group: 0,
        }
    }

    fn new_check(now: DateTime<Utc>) -> CheckInstance {
        CheckInstance::create(
            &TenantContext::new("biz"),
            "v-1",
            "u-1",
            vec![
                question("crit", Criticality::Critical),
                question("std", Criticality::Standard),
            ],
            None,
            now,
        )
    }

    #[test]
    fn test_create_is_pending_and_unanswered() {
        let check = new_check(Utc::now());
        assert_eq!(check.status, CheckStatus::Pending);
        assert_eq!(check.id.len(), 26);
        assert!(check.items.iter().all(|i| i.user_answer.is_none()));
        assert_eq!(check.business_id, "biz");
    }

    #[test]
    fn test_answers_progress_to_pass() {
        let now = Utc::now();
        let mut check = new_check(now);

        let eval = check.record_answer("crit", Answer::Pass, now).unwrap();
        assert_eq!(eval.status, CheckStatus::InProgress);
        assert_eq!(check.status, CheckStatus::InProgress);
        assert!(check.end_time.is_none());

        let eval = check.record_answer("std", Answer::Pass, now).unwrap();
        assert_eq!(eval.status, CheckStatus::CompletedPass);
        assert!(check.end_time.is_some());
        assert!(check.allows_session_start());
    }

    #[test]
    fn test_terminal_check_is_immutable() {
        let now = Utc::now();
        let mut check = new_check(now);
        check.record_answer("crit", Answer::Fail, now).unwrap();
        assert_eq!(check.status, CheckStatus::CompletedFail);

        let err = check.record_answer("std", Answer::Pass, now).unwrap_err();
        assert!(matches!(err, ChecklistError::CheckClosed { .. }));
        assert!(check.items[1].user_answer.is_none());
    }

    #[test]
    fn test_unknown_item() {
        let now = Utc::now();
        let mut check = new_check(now);
        let err = check.record_answer("nope", Answer::Pass, now).unwrap_err();
        assert!(matches!(err, ChecklistError::UnknownItem { .. }));
    }

    #[test]
    fn test_pending_becomes_overdue_then_expired() {
        let start = Utc::now();
        let mut check = new_check(start);
        let overdue = Duration::minutes(30);
        let expiry = Duration::minutes(60);

        assert!(!check.refresh_deadlines(start + Duration::minutes(10), overdue, expiry));
        assert!(check.refresh_deadlines(start + Duration::minutes(31), overdue, expiry));
        assert_eq!(check.status, CheckStatus::Overdue);

        // Overdue checks still accept answers.
        check
            .record_answer("crit", Answer::Pass, start + Duration::minutes(32))
            .unwrap();
        assert_eq!(check.status, CheckStatus::InProgress);

        assert!(check.refresh_deadlines(start + Duration::minutes(61), overdue, expiry));
        assert_eq!(check.status, CheckStatus::Expired);
        assert!(!check.allows_session_start());
    }

    #[test]
    fn test_completed_check_ignores_deadlines() {
        let start = Utc::now();
        let mut check = new_check(start);
        check.record_answer("crit", Answer::Pass, start).unwrap();
        check.record_answer("std", Answer::Pass, start).unwrap();
        assert!(!check.refresh_deadlines(
            start + Duration::days(2),
            Duration::minutes(30),
            Duration::minutes(60)
        ));
        assert_eq!(check.status, CheckStatus::CompletedPass);
    }
}
