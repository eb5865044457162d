//! Error types for fleet-core operations.
//! Keep FleetFfiError minimal and stable to avoid breaking FFI clients.

use std::path::PathBuf;

use crate::types::{CheckStatus, VehicleStatus};

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Kotlin/Swift)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
///
/// `Rejected` carries the stable `code` of the domain error so clients can
/// choose their own messaging; `General` covers everything else.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FleetFfiError {
    #[error("{message}")]
    General { message: String },

    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

impl From<FleetError> for FleetFfiError {
    fn from(err: FleetError) -> Self {
        match err.code() {
            Some(code) => FleetFfiError::Rejected {
                code: code.to_string(),
                message: err.to_string(),
            },
            None => FleetFfiError::General {
                message: err.to_string(),
            },
        }
    }
}

macro_rules! ffi_from_domain {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FleetFfiError {
                fn from(err: $ty) -> Self {
                    FleetFfiError::from(FleetError::from(err))
                }
            }
        )*
    };
}

ffi_from_domain!(
    HourMeterError,
    RotationError,
    ChecklistError,
    SessionError,
    StoreError
);

// ═══════════════════════════════════════════════════════════════════════════════
// Hour Meter
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HourMeterError {
    #[error("Hour meter reading is not a number: {input:?}")]
    InvalidFormat { input: String },

    #[error("Hour meter reading cannot be negative: {value}")]
    Negative { value: f64 },

    #[error("Hour meter reading {new} is lower than the current reading {current}")]
    Decreased { new: f64, current: f64 },

    #[error("Hour meter reading {value} must be greater than the current reading")]
    NotIncreased { value: f64 },
}

impl HourMeterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "invalid_format",
            Self::Negative { .. } => "negative",
            Self::Decreased { .. } => "decreased",
            Self::NotIncreased { .. } => "not_increased",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Checklist Rotation & Completion
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RotationError {
    #[error("Invalid rotation rules: {reason}")]
    InvalidRules { reason: String },

    #[error("Not enough {pool} questions: need {needed}, bank has {available}")]
    InsufficientQuestions {
        pool: String,
        needed: u32,
        available: u32,
    },

    #[error("No question in the bank covers required category {category:?}")]
    MissingRequiredCategory { category: String },

    #[error("Required category {category:?} cannot fit within {max} questions")]
    RequiredCategoriesUnsatisfiable { category: String, max: u32 },
}

impl RotationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRules { .. } => "invalid_rules",
            Self::InsufficientQuestions { .. } => "insufficient_questions",
            Self::MissingRequiredCategory { .. } => "missing_required_category",
            Self::RequiredCategoriesUnsatisfiable { .. } => "required_categories_unsatisfiable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChecklistError {
    #[error("Check {check_id} is closed ({status})")]
    CheckClosed { check_id: String, status: CheckStatus },

    #[error("Check {check_id} has no item {item_id}")]
    UnknownItem { check_id: String, item_id: String },

    #[error("Check not found: {0}")]
    CheckNotFound(String),
}

impl ChecklistError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CheckClosed { .. } => "check_closed",
            Self::UnknownItem { .. } => "unknown_item",
            Self::CheckNotFound(_) => "check_not_found",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Session Lifecycle
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Vehicle is not available ({status}): {reason}")]
    VehicleUnavailable {
        status: VehicleStatus,
        reason: String,
    },

    #[error("Vehicle {vehicle_id} already has an operating session {session_id}")]
    SessionAlreadyActive {
        vehicle_id: String,
        session_id: String,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is not operating")]
    SessionNotActive(String),

    #[error("Admin id is required to close a session as ADMIN_CLOSED")]
    MissingAdminId,

    #[error("Invalid hour meter reading: {0}")]
    InvalidHourMeter(#[from] HourMeterError),

    #[error("Check {check_id} is not the latest check for vehicle {vehicle_id}")]
    CheckNotFound {
        check_id: String,
        vehicle_id: String,
    },

    #[error("Check {check_id} does not allow a session to start ({status})")]
    ChecklistNotPassed {
        check_id: String,
        status: CheckStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::VehicleUnavailable { .. } => "vehicle_unavailable",
            Self::SessionAlreadyActive { .. } => "session_already_active",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionNotActive(_) => "session_not_active",
            Self::MissingAdminId => "missing_admin_id",
            Self::InvalidHourMeter(_) => "invalid_hour_meter",
            Self::CheckNotFound { .. } => "check_not_found",
            Self::ChecklistNotPassed { .. } => "checklist_not_passed",
            Self::Store(err) => err.code(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator Stores
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::Io { .. } => "store_io",
            Self::Json { .. } => "store_json",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Crate Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in fleet-core operations.
///
/// For FFI boundaries, use `FleetFfiError` instead.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error(transparent)]
    HourMeter(#[from] HourMeterError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error(transparent)]
    Checklist(#[from] ChecklistError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("No question bank loaded for business {0}")]
    QuestionBankMissing(String),
}

impl FleetError {
    /// Stable machine-readable code for domain rejections.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::HourMeter(err) => Some(err.code()),
            Self::Rotation(err) => Some(err.code()),
            Self::Checklist(err) => Some(err.code()),
            Self::Session(SessionError::Store(_)) => None,
            Self::Session(err) => Some(err.code()),
            Self::Store(_) => None,
            Self::ConfigMalformed { .. } => None,
            Self::QuestionBankMissing(_) => Some("question_bank_missing"),
        }
    }
}

/// Convenience type alias for Results using FleetError.
pub type Result<T> = std::result::Result<T, FleetError>;
