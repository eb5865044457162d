//! Hour-meter parsing, validation and display formatting.
//!
//! Two paths with deliberately different failure behavior:
//!
//! - **Validation** (`validate*`) hard-rejects malformed, negative or decreasing
//!   readings with a typed [`HourMeterError`].
//! - **Display** (`difference`, `format_*`) never fails: an unparsable value yields
//!   `None` or the original string unchanged.
//!
//! Readings accept either `.` or `,` as the decimal separator.

use crate::error::HourMeterError;
use crate::types::MeterPolicy;

/// Decimal places used when rendering readings for display.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 1;

/// Parses a meter reading, retrying with `,` normalized to `.` on failure.
///
/// Blank input and non-finite values (`NaN`, `inf`) are `InvalidFormat`.
pub fn parse_reading(input: &str) -> Result<f64, HourMeterError> {
    let trimmed = input.trim();
    let invalid = || HourMeterError::InvalidFormat {
        input: input.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parsed = trimmed
        .parse::<f64>()
        .or_else(|_| trimmed.replace(',', ".").parse::<f64>())
        .map_err(|_| invalid())?;

    if !parsed.is_finite() {
        return Err(invalid());
    }
    Ok(parsed)
}

/// Validates `new_value` against `current_value`.
///
/// An unparsable `current_value` is treated as 0.
pub fn validate(
    new_value: &str,
    current_value: &str,
    allow_equal: bool,
) -> Result<f64, HourMeterError> {
    let current = parse_reading(current_value).unwrap_or(0.0);
    validate_against(new_value, Some(current), allow_equal)
}

/// Same as [`validate`] with an already-known current value (`None` = 0).
pub fn validate_against(
    new_value: &str,
    current: Option<f64>,
    allow_equal: bool,
) -> Result<f64, HourMeterError> {
    let value = parse_reading(new_value)?;
    if value < 0.0 {
        return Err(HourMeterError::Negative { value });
    }

    let current = current.unwrap_or(0.0);
    if value < current {
        return Err(HourMeterError::Decreased {
            new: value,
            current,
        });
    }
    if value == current && !allow_equal {
        return Err(HourMeterError::NotIncreased { value });
    }
    Ok(value)
}

/// Validates under one of the named policies.
pub fn validate_with_policy(
    new_value: &str,
    current: Option<f64>,
    policy: MeterPolicy,
) -> Result<f64, HourMeterError> {
    validate_against(new_value, current, policy.allow_equal())
}

/// `final - initial` when both parse and `final >= initial`; otherwise unknown.
pub fn difference(final_value: &str, initial_value: &str) -> Option<f64> {
    let final_reading = parse_reading(final_value).ok()?;
    let initial_reading = parse_reading(initial_value).ok()?;
    (final_reading >= initial_reading).then(|| final_reading - initial_reading)
}

/// Renders a numeric reading with a fixed number of decimal places.
pub fn format_value(value: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, value)
}

/// Renders a reading string for display, returning it unchanged if it does not parse.
pub fn format_reading(value: &str, decimals: u32) -> String {
    match parse_reading(value) {
        Ok(parsed) => format_value(parsed, decimals),
        Err(_) => value.to_string(),
    }
}
