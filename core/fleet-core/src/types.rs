//! Core types shared across all fleet-safety clients.
//!
//! These types are the canonical domain shapes of the engine. Transport DTOs are
//! mapped into them at the client boundary; nothing in this crate sees a
//! backend-specific payload.
//!
//! **FFI Support:** All types are annotated with UniFFI macros for Kotlin/Swift bindings.
//! Timestamps cross the boundary as RFC 3339 strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
// Tenant & Vehicle
// ═══════════════════════════════════════════════════════════════════════════════

/// Business/site scope resolved by the authorization layer before any core call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TenantContext {
    pub business_id: String,
    #[serde(default)]
    pub site_id: Option<String>,
}

impl TenantContext {
    pub fn new(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            site_id: None,
        }
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }
}

/// Power source of a vehicle. `All` only appears on question applicability tags.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergySource {
    Electric,
    Lpg,
    Diesel,
    Petrol,
    Hybrid,
    All,
}

impl EnergySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electric => "ELECTRIC",
            Self::Lpg => "LPG",
            Self::Diesel => "DIESEL",
            Self::Petrol => "PETROL",
            Self::Hybrid => "HYBRID",
            Self::All => "ALL",
        }
    }
}

impl std::fmt::Display for EnergySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The vehicle facts the checklist selection needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct VehicleProfile {
    pub vehicle_id: String,
    pub vehicle_type: String,
    pub energy_source: EnergySource,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Question Bank
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Critical,
    Standard,
}

/// An operator's (or the expected) answer to a checklist question.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Answer {
    Pass,
    Fail,
}

/// Tag value meaning "applies to every vehicle type".
pub const ALL_VEHICLE_TYPES: &str = "ALL";

/// A master checklist question. Reference data maintained by administrators.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct QuestionBankItem {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    /// Empty means every energy source.
    #[serde(default)]
    pub energy_sources: Vec<EnergySource>,
    /// Empty or containing `ALL` means every vehicle type.
    #[serde(default)]
    pub vehicle_types: Vec<String>,
    #[serde(default)]
    pub component: Option<String>,
    pub question: String,
    pub criticality: Criticality,
    pub expected_answer: Answer,
    #[serde(default)]
    pub rotation_group: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Check Instances
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pending,
    InProgress,
    CompletedPass,
    CompletedFail,
    Expired,
    Overdue,
}

impl CheckStatus {
    /// Terminal checks never accept further answers.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompletedPass | Self::CompletedFail | Self::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::CompletedPass => "COMPLETED_PASS",
            Self::CompletedFail => "COMPLETED_FAIL",
            Self::Expired => "EXPIRED",
            Self::Overdue => "OVERDUE",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, uniffi::Record)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One selected question inside a check, plus the operator's answer once given.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct CheckItem {
    pub question: QuestionBankItem,
    #[serde(default)]
    pub user_answer: Option<Answer>,
    #[serde(default)]
    pub answered_at: Option<String>,
}

impl CheckItem {
    pub fn unanswered(question: QuestionBankItem) -> Self {
        Self {
            question,
            user_answer: None,
            answered_at: None,
        }
    }
}

/// One concrete pre-shift check with its rotated question subset.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct CheckInstance {
    pub id: String,
    pub vehicle_id: String,
    pub user_id: String,
    pub business_id: String,
    #[serde(default)]
    pub site_id: Option<String>,
    pub items: Vec<CheckItem>,
    pub status: CheckStatus,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Outcome of evaluating a check's current answers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct ChecklistEvaluation {
    pub status: CheckStatus,
    pub can_start_session: bool,
    pub is_complete: bool,
    pub has_critical_failure: bool,
    pub answered_count: u32,
    pub total_count: u32,
    /// Ids of every item answered differently from its expected answer.
    pub failed_item_ids: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rotation
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-checklist selection policy. Construct through [`RotationRules::new`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct RotationRules {
    pub max_questions_per_check: u32,
    #[serde(default)]
    pub required_categories: Vec<String>,
    pub critical_question_minimum: u32,
    pub standard_question_maximum: u32,
}

/// Per-vehicle rotation state, persisted by the caller between checks.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, uniffi::Record)]
pub struct RotationCursor {
    pub vehicle_id: String,
    /// Number of checks created with this cursor so far.
    pub position: u32,
    /// Standard item id → cursor position at which it last gave up its slot
    /// to a required-category item. Only eligible standard items are kept.
    #[serde(default)]
    pub last_displaced: HashMap<String, u32>,
}

impl RotationCursor {
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            position: 0,
            last_displaced: HashMap::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Hour Meter
// ═══════════════════════════════════════════════════════════════════════════════

/// An accepted hour-meter value for a vehicle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct HourMeterReading {
    pub value: f64,
    pub recorded_at: String,
}

/// Which comparison rule a meter reading is validated under.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum MeterPolicy {
    /// Session start: may equal the vehicle's last known value.
    InitialReading,
    /// Session end: must strictly exceed the session's initial reading.
    FinalReading,
    /// Administrator edit of the vehicle meter: must strictly increase.
    ManualUpdate,
}

impl MeterPolicy {
    pub fn allow_equal(&self) -> bool {
        matches!(self, Self::InitialReading)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Operating,
    NotOperating,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseMethod {
    UserClosed,
    AdminClosed,
    TimeoutClosed,
    GeofenceClosed,
}

/// The interval during which an operator is actively using a vehicle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct VehicleSession {
    pub id: String,
    pub vehicle_id: String,
    pub user_id: String,
    pub business_id: String,
    #[serde(default)]
    pub site_id: Option<String>,
    pub check_id: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub close_method: Option<CloseMethod>,
    #[serde(default)]
    pub closed_by_admin_id: Option<String>,
    #[serde(default)]
    pub initial_hour_meter: Option<f64>,
    #[serde(default)]
    pub final_hour_meter: Option<f64>,
    /// Set when a final reading was supplied but rejected without blocking the close.
    #[serde(default)]
    pub final_meter_warning: Option<String>,
}

impl VehicleSession {
    pub fn is_operating(&self) -> bool {
        self.status == SessionStatus::Operating
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vehicle Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Derived display status of a vehicle. Never stored.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, uniffi::Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    InUse,
    OutOfService,
    #[default]
    Unknown,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::InUse => "IN_USE",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Vehicle status plus the presentation fields the session-start gate needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, uniffi::Record)]
pub struct VehicleStatusReport {
    pub vehicle_id: String,
    pub status: VehicleStatus,
    pub is_available: bool,
    /// Empty when available.
    pub error_message: String,
    #[serde(default)]
    pub active_session_id: Option<String>,
    #[serde(default)]
    pub last_check_id: Option<String>,
}
