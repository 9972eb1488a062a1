//! Crit walk input validation.
//!
//! These rules used to live only in the UI. They are enforced here so every
//! caller gets the same checks.

use validator::Validate;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of free-text notes on a crit walk.
pub const MAX_NOTES_LEN: u64 = 4000;

/// Maximum length of a single comment.
pub const MAX_COMMENT_LEN: usize = 2000;

/// Maximum length of a work order number.
pub const MAX_WORK_ORDER_LEN: u64 = 64;

/// Maximum number of photos attached to one crit walk.
pub const MAX_PHOTOS_PER_WALK: usize = 20;

/// Default page size for crit walk history.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Upper bound on crit walk history page size.
pub const MAX_HISTORY_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// The non-photo fields a technician submits with a crit walk.
#[derive(Debug, Validate)]
pub struct CritWalkFields<'a> {
    #[validate(length(min = 1, max = 100))]
    pub technician_name: &'a str,
    #[validate(length(max = MAX_NOTES_LEN))]
    pub notes: Option<&'a str>,
    #[validate(length(max = MAX_WORK_ORDER_LEN))]
    pub work_order_number: Option<&'a str>,
}

/// Validate a crit walk submission before anything is written.
pub fn validate_crit_walk(
    fields: &CritWalkFields<'_>,
    has_failure: bool,
    photo_count: usize,
) -> Result<(), CoreError> {
    fields.validate()?;

    if fields.technician_name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Technician name must not be blank".into(),
        ));
    }
    if photo_count > MAX_PHOTOS_PER_WALK {
        return Err(CoreError::Validation(format!(
            "At most {MAX_PHOTOS_PER_WALK} photos per crit walk, got {photo_count}"
        )));
    }
    validate_failure_details(has_failure, fields.work_order_number)
}

/// A flagged failure must carry a non-blank work order number.
pub fn validate_failure_details(
    has_failure: bool,
    work_order_number: Option<&str>,
) -> Result<(), CoreError> {
    let has_work_order = work_order_number.is_some_and(|wo| !wo.trim().is_empty());
    if has_failure && !has_work_order {
        return Err(CoreError::Validation(
            "A work order number is required when a failure is flagged".into(),
        ));
    }
    if work_order_number.is_some_and(|wo| wo.chars().count() as u64 > MAX_WORK_ORDER_LEN) {
        return Err(CoreError::Validation(format!(
            "Work order number exceeds {MAX_WORK_ORDER_LEN} characters"
        )));
    }
    Ok(())
}

/// Comment text must be non-blank and bounded.
pub fn validate_comment(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation("Comment must not be empty".into()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(CoreError::Validation(format!(
            "Comment exceeds {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Clamp a requested history page size into `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
