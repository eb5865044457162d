use std::sync::Arc;

use chrono::{Duration, Utc};
use fleet_core::{
    Answer, CheckInstance, CheckStatus, CloseMethod, Criticality, EndSessionRequest,
    EnergySource, EngineConfig, FleetEngine, FleetFfiError, InMemoryStores, QuestionBankItem,
    RotationRules, SessionError, SessionLifecycleController, SessionStatus, StartSessionRequest,
    TenantContext, VehicleLocks, VehicleProfile, VehicleStatus,
};

fn item(id: &str, category: &str, criticality: Criticality) -> QuestionBankItem {
    QuestionBankItem {
        id: id.to_string(),
        category: category.to_string(),
        sub_category: None,
        energy_sources: vec![],
        vehicle_types: vec![],
        component: None,
        question: format!("{category} OK?"),
        criticality,
        expected_answer: Answer::Pass,
        rotation_group: 0,
    }
}

fn context() -> TenantContext {
    TenantContext::new("acme").with_site("depot-1")
}

fn vehicle(id: &str) -> VehicleProfile {
    VehicleProfile {
        vehicle_id: id.to_string(),
        vehicle_type: "FORKLIFT".to_string(),
        energy_source: EnergySource::Electric,
    }
}

fn rules() -> RotationRules {
    RotationRules::new(3, vec![], 1, 2).unwrap()
}

fn engine() -> FleetEngine {
    let engine = FleetEngine::in_memory(EngineConfig::default());
    engine.load_question_bank(
        "acme".to_string(),
        vec![
            item("brakes", "Brakes", Criticality::Critical),
            item("tyres", "Tyres", Criticality::Standard),
            item("lights", "Lights", Criticality::Standard),
        ],
    );
    engine
}

/// Runs a full check on the vehicle, answering `brakes` with `brakes_answer`.
fn run_check(engine: &FleetEngine, vehicle_id: &str, brakes_answer: Answer) -> CheckInstance {
    let check = engine
        .select_rotated_checklist(context(), vehicle(vehicle_id), "op-1".to_string(), rules(), None)
        .unwrap();
    for entry in &check.items {
        let answer = if entry.question.id == "brakes" {
            brakes_answer
        } else {
            Answer::Pass
        };
        let evaluation = engine
            .record_answer(check.id.clone(), entry.question.id.clone(), answer)
            .unwrap();
        if evaluation.status == CheckStatus::CompletedFail {
            break;
        }
    }
    engine.get_check(check.id).unwrap()
}

fn start(vehicle_id: &str, check_id: &str) -> StartSessionRequest {
    StartSessionRequest {
        context: context(),
        vehicle_id: vehicle_id.to_string(),
        user_id: "op-1".to_string(),
        check_id: check_id.to_string(),
        initial_hour_meter: None,
    }
}

fn rejected_code(err: FleetFfiError) -> String {
    match err {
        FleetFfiError::Rejected { code, .. } => code,
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn test_session_mutual_exclusion_and_release() {
    let engine = engine();
    let check = run_check(&engine, "fl-1", Answer::Pass);
    assert_eq!(check.status, CheckStatus::CompletedPass);

    let session = engine.start_session(start("fl-1", &check.id)).unwrap();
    let err = engine.start_session(start("fl-1", &check.id)).unwrap_err();
    assert_eq!(rejected_code(err), "session_already_active");

    engine
        .end_session(EndSessionRequest {
            session_id: session.id,
            close_method: CloseMethod::UserClosed,
            admin_id: None,
            final_hour_meter: None,
        })
        .unwrap();

    let again = engine.start_session(start("fl-1", &check.id)).unwrap();
    assert_eq!(again.status, SessionStatus::Operating);
}

#[test]
fn test_session_trumps_failed_check_history() {
    let engine = engine();
    let passed = run_check(&engine, "fl-2", Answer::Pass);
    let session = engine.start_session(start("fl-2", &passed.id)).unwrap();

    // A second operator fails a check on the same vehicle mid-session.
    let failed = run_check(&engine, "fl-2", Answer::Fail);
    assert_eq!(failed.status, CheckStatus::CompletedFail);
    let report = engine.get_vehicle_status("fl-2".to_string()).unwrap();
    assert_eq!(report.status, VehicleStatus::InUse);
    assert_eq!(report.active_session_id.as_deref(), Some(session.id.as_str()));

    engine
        .end_session(EndSessionRequest {
            session_id: session.id,
            close_method: CloseMethod::AdminClosed,
            admin_id: Some("admin-9".to_string()),
            final_hour_meter: None,
        })
        .unwrap();
    let report = engine.get_vehicle_status("fl-2".to_string()).unwrap();
    assert_eq!(report.status, VehicleStatus::OutOfService);
    assert!(!report.error_message.is_empty());

    let err = engine.start_session(start("fl-2", &failed.id)).unwrap_err();
    assert_eq!(rejected_code(err), "vehicle_unavailable");
}

#[test]
fn test_critical_failure_dominates_many_passes() {
    let mut items: Vec<QuestionBankItem> = (0..19)
        .map(|i| item(&format!("std-{i:02}"), "General", Criticality::Standard))
        .collect();
    items.push(item("brakes", "Brakes", Criticality::Critical));

    let engine = FleetEngine::in_memory(EngineConfig::default());
    engine.load_question_bank("acme".to_string(), items);
    let check = engine
        .select_rotated_checklist(
            context(),
            vehicle("fl-3"),
            "op-1".to_string(),
            RotationRules::new(20, vec![], 1, 19).unwrap(),
            None,
        )
        .unwrap();
    assert_eq!(check.items.len(), 20);

    // Critical items are listed first; answer the 19 passes before the failure.
    for entry in check.items.iter().rev() {
        let answer = if entry.question.id == "brakes" {
            Answer::Fail
        } else {
            Answer::Pass
        };
        engine
            .record_answer(check.id.clone(), entry.question.id.clone(), answer)
            .unwrap();
    }

    let evaluation = engine.evaluate_checklist(check.id.clone()).unwrap();
    assert_eq!(evaluation.status, CheckStatus::CompletedFail);
    assert!(!evaluation.can_start_session);
    assert_eq!(evaluation.failed_item_ids, vec!["brakes".to_string()]);
    assert_eq!(
        fleet_core::evaluate_check_items(engine.get_check(check.id).unwrap().items),
        evaluation
    );
}

#[test]
fn test_concurrent_starts_on_one_vehicle() {
    let stores = Arc::new(InMemoryStores::new());
    let controller = Arc::new(SessionLifecycleController::new(
        stores.clone(),
        stores.clone(),
        stores,
        Arc::new(VehicleLocks::new()),
        EngineConfig {
            require_passed_check: false,
            ..EngineConfig::default()
        },
    ));

    let workers: Vec<_> = (0..16)
        .map(|i| {
            let controller = Arc::clone(&controller);
            std::thread::spawn(move || {
                let mut request = start("fl-4", "external");
                request.user_id = format!("op-{i}");
                controller.start_session(request, Utc::now())
            })
        })
        .collect();

    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    let started = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::SessionAlreadyActive { .. })))
        .count();
    assert_eq!(started, 1);
    assert_eq!(refused, 15);
    assert_eq!(controller.list_active_sessions("acme", Some("depot-1")).unwrap().len(), 1);
}

#[test]
fn test_timeout_close_releases_vehicle() {
    let stores = Arc::new(InMemoryStores::new());
    let controller = SessionLifecycleController::new(
        stores.clone(),
        stores.clone(),
        stores,
        Arc::new(VehicleLocks::new()),
        EngineConfig {
            require_passed_check: false,
            max_session_hours: 8,
            ..EngineConfig::default()
        },
    );
    let now = Utc::now();
    controller
        .start_session(start("fl-5", "external"), now - Duration::hours(9))
        .unwrap();

    let closed = controller.close_timed_out_sessions(&context(), now).unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].close_method, Some(CloseMethod::TimeoutClosed));
    assert_eq!(
        controller.vehicle_status("fl-5").unwrap().status,
        VehicleStatus::Available
    );
}
