//! Rotated question selection for one pre-shift check.
//!
//! Selection is a pure function of (bank, vehicle, rules, cursor). The caller
//! persists the returned cursor; nothing here holds state between calls.
//!
//! # Algorithm
//!
//! 1. Keep bank items that apply to the vehicle's energy source and type.
//! 2. Split into CRITICAL and STANDARD pools, each sorted by (rotation group, id).
//! 3. Take `critical_question_minimum` critical items from a cycle that
//!    interleaves the rotation groups; the cursor position picks the window.
//! 4. Fill up to `standard_question_maximum` standard items the same way,
//!    never past `max_questions_per_check`.
//! 5. Force one item per required category that is not yet covered. When the
//!    check is full, a standard item gives up its slot: one never displaced
//!    before, else the one displaced longest ago. The cursor remembers who gave
//!    way so displacement rotates instead of hitting the same item every time.
//!
//! Output order: required-category items (declaration order), then critical,
//! then standard.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::RotationError;
use crate::types::{
    Criticality, EnergySource, QuestionBankItem, RotationCursor, RotationRules, VehicleProfile,
    ALL_VEHICLE_TYPES,
};

/// Result of one selection: the ordered questions and the cursor to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSelection {
    pub questions: Vec<QuestionBankItem>,
    pub forced_item_ids: Vec<String>,
    pub next_cursor: RotationCursor,
}

/// Whether a bank item applies to the given vehicle.
pub fn applies_to(item: &QuestionBankItem, vehicle: &VehicleProfile) -> bool {
    let energy_ok = item.energy_sources.is_empty()
        || item
            .energy_sources
            .iter()
            .any(|s| *s == EnergySource::All || *s == vehicle.energy_source);

    let type_ok = item.vehicle_types.is_empty()
        || item.vehicle_types.iter().any(|t| {
            t.eq_ignore_ascii_case(ALL_VEHICLE_TYPES) || t.eq_ignore_ascii_case(&vehicle.vehicle_type)
        });

    energy_ok && type_ok
}

/// Selects today's ordered question set for `vehicle`.
pub fn select_rotated(
    bank: &[QuestionBankItem],
    vehicle: &VehicleProfile,
    rules: &RotationRules,
    cursor: &RotationCursor,
) -> Result<RotationSelection, RotationError> {
    rules.validate()?;

    let mut eligible: Vec<&QuestionBankItem> =
        bank.iter().filter(|item| applies_to(item, vehicle)).collect();
    eligible.sort_by(|a, b| {
        a.rotation_group
            .cmp(&b.rotation_group)
            .then_with(|| a.id.cmp(&b.id))
    });
    eligible.dedup_by(|a, b| a.id == b.id);

    let (critical_pool, standard_pool): (Vec<&QuestionBankItem>, Vec<&QuestionBankItem>) =
        eligible
            .iter()
            .copied()
            .partition(|item| item.criticality == Criticality::Critical);

    let critical_needed = rules.critical_question_minimum as usize;
    if critical_pool.len() < critical_needed {
        return Err(RotationError::InsufficientQuestions {
            pool: "critical".to_string(),
            needed: rules.critical_question_minimum,
            available: critical_pool.len() as u32,
        });
    }

    let max = rules.max_questions_per_check as usize;
    let mut critical = rotation_window(&critical_pool, cursor.position, critical_needed);
    let standard_slots = (rules.standard_question_maximum as usize).min(max - critical.len());
    let mut standard = rotation_window(&standard_pool, cursor.position, standard_slots);

    // Entries for items that left the pool would never be read again.
    let mut last_displaced = cursor.last_displaced.clone();
    last_displaced.retain(|id, _| standard_pool.iter().any(|item| &item.id == id));
    let mut next_cursor = RotationCursor {
        vehicle_id: vehicle.vehicle_id.clone(),
        position: cursor.position.wrapping_add(1),
        last_displaced,
    };

    let mut required: Vec<&QuestionBankItem> = Vec::with_capacity(rules.required_categories.len());
    let mut forced_item_ids = Vec::new();

    for category in &rules.required_categories {
        if let Some(pos) = critical.iter().position(|i| &i.category == category) {
            required.push(critical.remove(pos));
            continue;
        }
        if let Some(pos) = standard.iter().position(|i| &i.category == category) {
            required.push(standard.remove(pos));
            continue;
        }

        let candidates: Vec<&QuestionBankItem> = eligible
            .iter()
            .copied()
            .filter(|i| &i.category == category)
            .collect();
        let Some(forced) = rotation_window(&candidates, cursor.position, 1).into_iter().next() else {
            return Err(RotationError::MissingRequiredCategory {
                category: category.clone(),
            });
        };

        if required.len() + critical.len() + standard.len() >= max {
            if let Some(pos) = least_recently_displaced(&standard, rules, &next_cursor) {
                let displaced = standard.remove(pos);
                next_cursor
                    .last_displaced
                    .insert(displaced.id.clone(), cursor.position);
                debug!(
                    item_id = %displaced.id,
                    forced_id = %forced.id,
                    "Displaced standard question for required category"
                );
            } else if forced.criticality == Criticality::Critical {
                // Swapping one critical item for another keeps the critical minimum.
                let pos = critical
                    .iter()
                    .rposition(|i| !rules.is_required_category(&i.category))
                    .ok_or_else(|| RotationError::RequiredCategoriesUnsatisfiable {
                        category: category.clone(),
                        max: rules.max_questions_per_check,
                    })?;
                critical.remove(pos);
            } else {
                return Err(RotationError::RequiredCategoriesUnsatisfiable {
                    category: category.clone(),
                    max: rules.max_questions_per_check,
                });
            }
        }

        forced_item_ids.push(forced.id.clone());
        required.push(forced);
    }

    let questions: Vec<QuestionBankItem> = required
        .into_iter()
        .chain(critical)
        .chain(standard)
        .cloned()
        .collect();

    debug!(
        vehicle_id = %vehicle.vehicle_id,
        position = cursor.position,
        selected = questions.len(),
        forced = forced_item_ids.len(),
        "Selected rotated checklist"
    );

    Ok(RotationSelection {
        questions,
        forced_item_ids,
        next_cursor,
    })
}

/// Takes `count` items from the pool, spread across rotation groups.
///
/// The pool is interleaved group by group (first item of every group, then the
/// second, ...) into a fixed cycle. Each cursor position reads the next window of
/// `count` items from that cycle, so consecutive checks ask different items and
/// every item comes up within `ceil(len / count)` checks.
fn rotation_window<'a>(
    pool: &[&'a QuestionBankItem],
    position: u32,
    count: usize,
) -> Vec<&'a QuestionBankItem> {
    if count == 0 || pool.is_empty() {
        return Vec::new();
    }

    let mut groups: BTreeMap<u32, Vec<&'a QuestionBankItem>> = BTreeMap::new();
    for item in pool {
        groups.entry(item.rotation_group).or_default().push(item);
    }
    let longest = groups.values().map(Vec::len).max().unwrap_or(0);

    let mut cycle = Vec::with_capacity(pool.len());
    for round in 0..longest {
        cycle.extend(groups.values().filter_map(|group| group.get(round).copied()));
    }

    let len = cycle.len();
    let count = count.min(len);
    let start = (position as usize).wrapping_mul(count) % len;
    (0..count).map(|offset| cycle[(start + offset) % len]).collect()
}

/// Index of the standard item to displace: never displaced (or displaced longest
/// ago) first, later-selected first on ties. Items covering a required category stay.
fn least_recently_displaced(
    standard: &[&QuestionBankItem],
    rules: &RotationRules,
    cursor: &RotationCursor,
) -> Option<usize> {
    standard
        .iter()
        .enumerate()
        .filter(|(_, item)| !rules.is_required_category(&item.category))
        .min_by_key(|(index, item)| {
            (cursor.last_displaced.get(&item.id).copied(), Reverse(*index))
        })
        .map(|(index, _)| index)
}
