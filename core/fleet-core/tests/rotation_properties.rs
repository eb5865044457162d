use std::collections::HashSet;
use std::path::PathBuf;

use fleet_core::{
    applies_to, select_rotated, Criticality, EnergySource, QuestionBankItem, RotationCursor,
    RotationError, RotationRules, VehicleProfile,
};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn bank() -> Vec<QuestionBankItem> {
    let content = std::fs::read_to_string(fixture_path("question_bank.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn rules() -> RotationRules {
    let content = std::fs::read_to_string(fixture_path("rotation_rules.json")).unwrap();
    let rules: RotationRules = serde_json::from_str(&content).unwrap();
    rules.validate().unwrap();
    rules
}

fn lpg_forklift() -> VehicleProfile {
    VehicleProfile {
        vehicle_id: "forklift-7".to_string(),
        vehicle_type: "FORKLIFT".to_string(),
        energy_source: EnergySource::Lpg,
    }
}

fn critical_ids(questions: &[QuestionBankItem]) -> HashSet<String> {
    questions
        .iter()
        .filter(|q| q.criticality == Criticality::Critical)
        .map(|q| q.id.clone())
        .collect()
}

#[test]
fn test_identical_inputs_select_identical_questions() {
    let cursor = RotationCursor::new("forklift-7");
    let a = select_rotated(&bank(), &lpg_forklift(), &rules(), &cursor).unwrap();
    let b = select_rotated(&bank(), &lpg_forklift(), &rules(), &cursor).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_advancing_cursor_changes_critical_subset() {
    let first = select_rotated(
        &bank(),
        &lpg_forklift(),
        &rules(),
        &RotationCursor::new("forklift-7"),
    )
    .unwrap();
    let second = select_rotated(&bank(), &lpg_forklift(), &rules(), &first.next_cursor).unwrap();

    assert_eq!(second.next_cursor.position, first.next_cursor.position + 1);
    assert_ne!(
        critical_ids(&first.questions),
        critical_ids(&second.questions)
    );
}

#[test]
fn test_every_selection_respects_rules() {
    let bank = bank();
    let rules = rules();
    let vehicle = lpg_forklift();
    let mut cursor = RotationCursor::new("forklift-7");

    for _ in 0..12 {
        let selection = select_rotated(&bank, &vehicle, &rules, &cursor).unwrap();
        let questions = &selection.questions;

        assert!(questions.len() <= rules.max_questions_per_check as usize);
        assert!(critical_ids(questions).len() >= rules.critical_question_minimum as usize);

        let unique: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(unique.len(), questions.len(), "duplicate question selected");

        for category in &rules.required_categories {
            assert!(
                questions.iter().any(|q| &q.category == category),
                "required category {category} missing at position {}",
                cursor.position
            );
        }
        assert!(questions.iter().all(|q| applies_to(q, &vehicle)));

        cursor = selection.next_cursor;
    }
}

#[test]
fn test_rotation_covers_every_critical_item() {
    let bank = bank();
    let rules = rules();
    let vehicle = lpg_forklift();
    let eligible: HashSet<String> = bank
        .iter()
        .filter(|q| q.criticality == Criticality::Critical && applies_to(q, &vehicle))
        .map(|q| q.id.clone())
        .collect();

    let mut seen = HashSet::new();
    let mut cursor = RotationCursor::new("forklift-7");
    for _ in 0..eligible.len() {
        let selection = select_rotated(&bank, &vehicle, &rules, &cursor).unwrap();
        seen.extend(critical_ids(&selection.questions));
        cursor = selection.next_cursor;
    }

    assert_eq!(seen, eligible);
    assert!(!seen.contains("bat-01"), "electric-only item selected for LPG");
}

#[test]
fn test_required_category_absent_for_energy_source() {
    let rules = RotationRules::new(8, vec!["Battery".to_string()], 4, 4).unwrap();
    let err = select_rotated(
        &bank(),
        &lpg_forklift(),
        &rules,
        &RotationCursor::new("forklift-7"),
    )
    .unwrap_err();
    assert_eq!(
        err,
        RotationError::MissingRequiredCategory {
            category: "Battery".to_string()
        }
    );
}

#[test]
fn test_critical_minimum_larger_than_bank() {
    let rules = RotationRules::new(12, vec![], 10, 2).unwrap();
    let err = select_rotated(
        &bank(),
        &lpg_forklift(),
        &rules,
        &RotationCursor::new("forklift-7"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RotationError::InsufficientQuestions {
            needed: 10,
            available: 9,
            ..
        }
    ));
}
