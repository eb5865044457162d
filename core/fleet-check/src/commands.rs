//! Subcommand implementations. Each writes JSON (or a plain value) to stdout.

use std::path::Path;

use fleet_core::{
    hour_meter, select_rotated, EnergySource, FleetEngine, FleetFfiError, MeterPolicy,
    QuestionBankItem, RotationCursor, RotationError, RotationRules, StorageConfig,
    TenantContext, VehicleProfile,
};
use fs_err as fs;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Engine(#[from] FleetFfiError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error("{0}")]
    Rejected(String),
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|source| CommandError::Json {
        path: "<stdout>".to_string(),
        source,
    })?;
    println!("{rendered}");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| CommandError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn context(business_id: String, site_id: Option<String>) -> TenantContext {
    let context = TenantContext::new(business_id);
    match site_id {
        Some(site) => context.with_site(site),
        None => context,
    }
}

pub fn status(storage: StorageConfig, vehicle_id: String) -> Result<(), CommandError> {
    let engine = FleetEngine::with_storage(storage)?;
    let report = engine.get_vehicle_status(vehicle_id)?;
    print_json(&report)
}

pub fn sessions(
    storage: StorageConfig,
    business_id: String,
    site_id: Option<String>,
) -> Result<(), CommandError> {
    let engine = FleetEngine::with_storage(storage)?;
    let sessions = engine.list_active_sessions(business_id, site_id)?;
    print_json(&sessions)
}

pub fn close_stale(
    storage: StorageConfig,
    business_id: String,
    site_id: Option<String>,
) -> Result<(), CommandError> {
    let engine = FleetEngine::with_storage(storage)?;
    let closed = engine.close_timed_out_sessions(context(business_id, site_id))?;
    info!(count = closed.len(), "Closed timed-out sessions");
    print_json(&closed)
}

#[derive(Serialize)]
struct PreviewQuestion {
    id: String,
    category: String,
    critical: bool,
    forced: bool,
}

#[derive(Serialize)]
struct RotationPreview {
    position: u32,
    next_position: u32,
    questions: Vec<PreviewQuestion>,
}

pub struct RotateArgs<'a> {
    pub bank: &'a Path,
    pub rules: &'a Path,
    pub vehicle_id: String,
    pub vehicle_type: String,
    pub energy_source: EnergySource,
    pub position: u32,
    pub checks: u32,
}

/// Previews the selection for `checks` consecutive cursor positions without
/// touching any stored cursor.
pub fn rotate(args: RotateArgs<'_>) -> Result<(), CommandError> {
    let bank: Vec<QuestionBankItem> = read_json(args.bank)?;
    let rules: RotationRules = read_json(args.rules)?;
    let vehicle = VehicleProfile {
        vehicle_id: args.vehicle_id.clone(),
        vehicle_type: args.vehicle_type,
        energy_source: args.energy_source,
    };

    let mut cursor = RotationCursor {
        position: args.position,
        ..RotationCursor::new(args.vehicle_id)
    };
    let mut previews = Vec::with_capacity(args.checks as usize);
    for _ in 0..args.checks.max(1) {
        let selection = select_rotated(&bank, &vehicle, &rules, &cursor)?;
        previews.push(RotationPreview {
            position: cursor.position,
            next_position: selection.next_cursor.position,
            questions: selection
                .questions
                .iter()
                .map(|q| PreviewQuestion {
                    id: q.id.clone(),
                    category: q.category.clone(),
                    critical: q.criticality == fleet_core::Criticality::Critical,
                    forced: selection.forced_item_ids.contains(&q.id),
                })
                .collect(),
        });
        cursor = selection.next_cursor;
    }
    print_json(&previews)
}

/// Prints the accepted value, or fails with the rejection reason.
pub fn meter_validate(
    new_value: &str,
    current_value: &str,
    policy: MeterPolicy,
) -> Result<(), CommandError> {
    match hour_meter::validate(new_value, current_value, policy.allow_equal()) {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(e) => Err(CommandError::Rejected(format!("{}: {}", e.code(), e))),
    }
}

pub fn meter_format(value: &str, decimals: u32) {
    println!("{}", hour_meter::format_reading(value, decimals));
}
