//! Completion and pass/fail evaluation of a check's answers.
//!
//! Pure and idempotent: the same item list always yields the same evaluation.
//! A critical item answered against its expected answer fails the whole check
//! immediately, whether or not the remaining items are answered.

use crate::types::{CheckItem, CheckStatus, ChecklistEvaluation, Criticality};

/// True iff every item carries an answer.
pub fn is_complete(items: &[CheckItem]) -> bool {
    items.iter().all(|item| item.user_answer.is_some())
}

/// True iff any critical item was answered differently from its expected answer.
pub fn has_critical_failure(items: &[CheckItem]) -> bool {
    items
        .iter()
        .any(|item| item.question.criticality == Criticality::Critical && is_failed(item))
}

fn is_failed(item: &CheckItem) -> bool {
    item.user_answer
        .is_some_and(|answer| answer != item.question.expected_answer)
}

/// Derives the check status and session gate from the current answers.
pub fn evaluate(items: &[CheckItem]) -> ChecklistEvaluation {
    let complete = is_complete(items);
    let critical_failure = has_critical_failure(items);

    let status = if critical_failure {
        CheckStatus::CompletedFail
    } else if complete {
        CheckStatus::CompletedPass
    } else {
        CheckStatus::InProgress
    };

    ChecklistEvaluation {
        status,
        can_start_session: complete && !critical_failure,
        is_complete: complete,
        has_critical_failure: critical_failure,
        answered_count: items.iter().filter(|i| i.user_answer.is_some()).count() as u32,
        total_count: items.len() as u32,
        failed_item_ids: items
            .iter()
            .filter(|item| is_failed(item))
            .map(|item| item.question.id.clone())
            .collect(),
    }
}
