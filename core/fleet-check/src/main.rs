//! fleet-check: inspect and repair a fleet-safety client's local state.
//!
//! Reads the same storage root as the mobile engine (`config.json`,
//! `snapshot.json`) and prints JSON to stdout.
//!
//! ## Subcommands
//!
//! - `status`: Derived status of one vehicle
//! - `sessions`: OPERATING sessions for a business or site
//! - `close-stale`: Close sessions past `max_session_hours` as TIMEOUT_CLOSED
//! - `rotate`: Preview rotated checklists from JSON bank and rules files
//! - `meter`: Validate or format an hour-meter reading

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fleet_core::hour_meter::DEFAULT_DISPLAY_DECIMALS;
use fleet_core::{EnergySource, MeterPolicy, StorageConfig};

#[derive(Parser)]
#[command(name = "fleet-check")]
#[command(about = "Fleet-safety local state inspector")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to the platform data dir + fleet-safety)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the derived status of a vehicle
    Status {
        #[arg(value_name = "VEHICLE_ID")]
        vehicle_id: String,
    },

    /// List OPERATING sessions
    Sessions {
        #[arg(long)]
        business: String,

        #[arg(long)]
        site: Option<String>,
    },

    /// Close sessions that exceeded the configured maximum duration
    CloseStale {
        #[arg(long)]
        business: String,

        #[arg(long)]
        site: Option<String>,
    },

    /// Preview rotated checklists without touching stored cursors
    Rotate {
        /// JSON array of question bank items
        #[arg(long, value_name = "FILE")]
        bank: PathBuf,

        /// JSON rotation rules
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,

        #[arg(long, default_value = "preview")]
        vehicle_id: String,

        #[arg(long)]
        vehicle_type: String,

        #[arg(long, value_enum)]
        energy: EnergyArg,

        /// Cursor position to start from
        #[arg(long, default_value_t = 0)]
        position: u32,

        /// Number of consecutive checks to preview
        #[arg(long, default_value_t = 1)]
        checks: u32,
    },

    /// Hour-meter helpers
    Meter {
        #[command(subcommand)]
        command: MeterCommand,
    },
}

#[derive(Subcommand)]
enum MeterCommand {
    /// Validate a new reading against the current one
    Validate {
        new_value: String,
        current_value: String,

        #[arg(long, value_enum, default_value_t = PolicyArg::Manual)]
        policy: PolicyArg,
    },

    /// Render a reading for display (never fails)
    Format {
        value: String,

        #[arg(long, default_value_t = DEFAULT_DISPLAY_DECIMALS)]
        decimals: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EnergyArg {
    Electric,
    Lpg,
    Diesel,
    Petrol,
    Hybrid,
}

impl From<EnergyArg> for EnergySource {
    fn from(arg: EnergyArg) -> Self {
        match arg {
            EnergyArg::Electric => EnergySource::Electric,
            EnergyArg::Lpg => EnergySource::Lpg,
            EnergyArg::Diesel => EnergySource::Diesel,
            EnergyArg::Petrol => EnergySource::Petrol,
            EnergyArg::Hybrid => EnergySource::Hybrid,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Initial,
    Final,
    Manual,
}

impl From<PolicyArg> for MeterPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Initial => MeterPolicy::InitialReading,
            PolicyArg::Final => MeterPolicy::FinalReading,
            PolicyArg::Manual => MeterPolicy::ManualUpdate,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .root
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let logging_guard = logging::init(&storage.logs_dir());

    let result = match cli.command {
        Commands::Status { vehicle_id } => commands::status(storage, vehicle_id),
        Commands::Sessions { business, site } => commands::sessions(storage, business, site),
        Commands::CloseStale { business, site } => commands::close_stale(storage, business, site),
        Commands::Rotate {
            bank,
            rules,
            vehicle_id,
            vehicle_type,
            energy,
            position,
            checks,
        } => commands::rotate(commands::RotateArgs {
            bank: &bank,
            rules: &rules,
            vehicle_id,
            vehicle_type,
            energy_source: energy.into(),
            position,
            checks,
        }),
        Commands::Meter { command } => match command {
            MeterCommand::Validate {
                new_value,
                current_value,
                policy,
            } => commands::meter_validate(&new_value, &current_value, policy.into()),
            MeterCommand::Format { value, decimals } => {
                commands::meter_format(&value, decimals);
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fleet-check failed");
        // exit() skips destructors; flush the file writer first.
        drop(logging_guard);
        std::process::exit(1);
    }
}
