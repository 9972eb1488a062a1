//! Crit walk retention policy.

use chrono::{DateTime, Duration, Utc};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Crit walks and their photos are kept this long.
pub const RETENTION_DAYS: i64 = 30;

/// Longest accepted retention window (100 years).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Anything completed strictly before the returned instant is expired.
///
/// The window is clamped to `1..=MAX_RETENTION_DAYS`, and a cutoff before the
/// earliest representable instant saturates there.
pub fn retention_cutoff(now: Timestamp, retention_days: i64) -> Timestamp {
    let days = retention_days.clamp(1, MAX_RETENTION_DAYS);
    now.checked_sub_signed(Duration::days(days))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Reject retention windows that would wipe fresh data or overflow the
/// cutoff arithmetic.
pub fn validate_retention_days(days: i64) -> Result<(), CoreError> {
    if !(1..=MAX_RETENTION_DAYS).contains(&days) {
        return Err(CoreError::Validation(format!(
            "Retention must be between 1 and {MAX_RETENTION_DAYS} days, got {days}"
        )));
    }
    Ok(())
}
