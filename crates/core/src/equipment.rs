//! Equipment registry validation.

use crate::error::CoreError;

/// Default crit walk interval for new equipment (hours).
pub const DEFAULT_CRIT_WALK_INTERVAL_HOURS: i32 = 12;

/// Longest configurable crit walk interval (one week).
pub const MAX_CRIT_WALK_INTERVAL_HOURS: i32 = 168;

/// Upper bound on the expected photo count for one walk.
pub const MAX_EXPECTED_PHOTO_COUNT: i32 = 20;

/// Validate the name and optional numeric settings of an equipment item.
///
/// `crit_walk_interval_hours` is informational; the status engine uses fixed
/// thresholds regardless of its value.
pub fn validate_equipment(
    name: Option<&str>,
    crit_walk_interval_hours: Option<i32>,
    expected_photo_count: Option<i32>,
) -> Result<(), CoreError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("Equipment name must not be blank".into()));
        }
        if name.chars().count() > 200 {
            return Err(CoreError::Validation(
                "Equipment name exceeds 200 characters".into(),
            ));
        }
    }
    if let Some(hours) = crit_walk_interval_hours {
        if !(1..=MAX_CRIT_WALK_INTERVAL_HOURS).contains(&hours) {
            return Err(CoreError::Validation(format!(
                "Crit walk interval must be between 1 and {MAX_CRIT_WALK_INTERVAL_HOURS} hours, got {hours}"
            )));
        }
    }
    if let Some(count) = expected_photo_count {
        if !(0..=MAX_EXPECTED_PHOTO_COUNT).contains(&count) {
            return Err(CoreError::Validation(format!(
                "Expected photo count must be between 0 and {MAX_EXPECTED_PHOTO_COUNT}, got {count}"
            )));
        }
    }
    Ok(())
}
