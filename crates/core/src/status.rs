//! Staleness status engine.
//!
//! Maps the time of the last crit walk to a traffic-light classification.
//! Thresholds are fixed; the per-equipment `crit_walk_interval_hours` column
//! is stored but deliberately not consulted here.
//!
//! Status is never read back from storage for display. Elapsed time advances
//! without writes, so callers must classify on every read.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Equipment walked within this many hours is green (inclusive).
pub const GREEN_MAX_HOURS: i64 = 8;

/// Equipment walked within this many hours is yellow (inclusive).
pub const YELLOW_MAX_HOURS: i64 = 12;

// ---------------------------------------------------------------------------
// StatusColor
// ---------------------------------------------------------------------------

/// Staleness classification for a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
    Never,
}

impl StatusColor {
    /// Lowercase wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Green => "green",
            StatusColor::Yellow => "yellow",
            StatusColor::Red => "red",
            StatusColor::Never => "never",
        }
    }
}

impl std::fmt::Display for StatusColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify against the current wall clock.
pub fn classify(last_crit_walk_at: Option<Timestamp>) -> StatusColor {
    classify_at(last_crit_walk_at, Utc::now())
}

/// Classify against an explicit `now`.
///
/// Elapsed time is compared at full precision, so `12h 1s` is already red.
/// A last walk in the future (clock skew) counts as green.
pub fn classify_at(last_crit_walk_at: Option<Timestamp>, now: Timestamp) -> StatusColor {
    let Some(last) = last_crit_walk_at else {
        return StatusColor::Never;
    };

    let elapsed = now - last;
    if elapsed <= Duration::hours(GREEN_MAX_HOURS) {
        StatusColor::Green
    } else if elapsed <= Duration::hours(YELLOW_MAX_HOURS) {
        StatusColor::Yellow
    } else {
        StatusColor::Red
    }
}

/// Fractional hours elapsed since `timestamp`, or `None` if never walked.
pub fn hours_since(timestamp: Option<Timestamp>, now: Timestamp) -> Option<f64> {
    timestamp.map(|ts| (now - ts).num_milliseconds() as f64 / 3_600_000.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
