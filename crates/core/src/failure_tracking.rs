//! Failure lifecycle and equipment status aggregate math.
//!
//! A crit walk moves between three failure states:
//!
//! ```text
//! NoFailure --edit(true)--> Flagged --resolve--> Resolved
//! Flagged  --edit(false)--> NoFailure
//! Resolved --edit(true)--> Flagged   (re-open, resolution cleared)
//! ```
//!
//! The per-equipment [`StatusAggregate`] is a cache of facts derivable from
//! the crit walk log. Create and resolve apply deltas; edits recount the log
//! via [`FailureSummary::from_samples`], which also heals any drift the delta
//! paths accumulated.

use serde::Serialize;

use crate::crit_walk::validate_failure_details;
use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// FailureState
// ---------------------------------------------------------------------------

/// Failure lifecycle state of a single crit walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureState {
    NoFailure,
    Flagged,
    Resolved,
}

impl FailureState {
    /// Derive the state from the stored flag and resolution timestamp.
    pub fn of(has_failure: bool, failure_resolved_at: Option<Timestamp>) -> Self {
        match (has_failure, failure_resolved_at) {
            (false, _) => FailureState::NoFailure,
            (true, None) => FailureState::Flagged,
            (true, Some(_)) => FailureState::Resolved,
        }
    }

    /// An active failure is flagged and not yet resolved.
    pub fn is_active(self) -> bool {
        self == FailureState::Flagged
    }
}

// ---------------------------------------------------------------------------
// FailureFields
// ---------------------------------------------------------------------------

/// The mutable failure columns of a crit walk.
///
/// Invariant: `failure_resolved_at` and `failure_resolved_by` are `None`
/// whenever `has_failure` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureFields {
    pub has_failure: bool,
    pub work_order_number: Option<String>,
    pub failure_resolved_at: Option<Timestamp>,
    pub failure_resolved_by: Option<String>,
}

impl FailureFields {
    /// Fields for a freshly created crit walk.
    pub fn new(has_failure: bool, work_order_number: Option<String>) -> Self {
        Self {
            has_failure,
            work_order_number,
            failure_resolved_at: None,
            failure_resolved_by: None,
        }
    }

    pub fn state(&self) -> FailureState {
        FailureState::of(self.has_failure, self.failure_resolved_at)
    }

    /// Apply a manager edit of the failure flag and work order.
    ///
    /// Flagging a resolved walk re-opens it and clears the resolution, so the
    /// walk counts as active again. Clearing the flag always clears the
    /// resolution.
    pub fn edit(
        &self,
        has_failure: bool,
        work_order_number: Option<String>,
    ) -> Result<FailureFields, CoreError> {
        validate_failure_details(has_failure, work_order_number.as_deref())?;

        // Every edit lands in NoFailure or Flagged; neither carries a resolution.
        Ok(FailureFields::new(has_failure, work_order_number))
    }

    /// Mark a flagged failure as resolved.
    ///
    /// Resolving a walk without a failure is a validation error; resolving an
    /// already-resolved walk is a conflict and leaves the original resolver in
    /// place.
    pub fn resolve(&self, resolved_by: &str, at: Timestamp) -> Result<FailureFields, CoreError> {
        match self.state() {
            FailureState::NoFailure => Err(CoreError::Validation(
                "Crit walk has no failure to resolve".into(),
            )),
            FailureState::Resolved => Err(CoreError::Conflict(format!(
                "Failure already resolved by {}",
                self.failure_resolved_by.as_deref().unwrap_or("unknown")
            ))),
            FailureState::Flagged => Ok(FailureFields {
                failure_resolved_at: Some(at),
                failure_resolved_by: Some(resolved_by.to_string()),
                ..self.clone()
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate deltas
// ---------------------------------------------------------------------------

/// Facts about a newly created crit walk that feed the status aggregate.
#[derive(Debug, Clone)]
pub struct WalkRecorded {
    pub completed_at: Timestamp,
    pub technician_name: String,
    pub has_failure: bool,
}

/// Decrement an active failure count by one, floored at zero.
pub fn release_one(active_failure_count: i32) -> i32 {
    (active_failure_count - 1).max(0)
}

/// Denormalized per-equipment status fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusAggregate {
    pub last_crit_walk_at: Option<Timestamp>,
    pub last_crit_walk_by: Option<String>,
    pub total_walks_completed: i64,
    pub has_active_failure: bool,
    pub active_failure_count: i32,
    pub last_failure_at: Option<Timestamp>,
}

impl StatusAggregate {
    /// Apply the create-walk delta.
    ///
    /// The last-walk fields never move backwards, so an out-of-order write
    /// of an older walk still counts but does not replace a newer one.
    pub fn record_walk(&mut self, walk: &WalkRecorded) {
        let is_latest = self
            .last_crit_walk_at
            .map_or(true, |last| last <= walk.completed_at);
        if is_latest {
            self.last_crit_walk_at = Some(walk.completed_at);
            self.last_crit_walk_by = Some(walk.technician_name.clone());
        }

        self.total_walks_completed += 1;

        if walk.has_failure {
            self.active_failure_count += 1;
            self.last_failure_at = Some(
                self.last_failure_at
                    .map_or(walk.completed_at, |last| last.max(walk.completed_at)),
            );
        }
        self.has_active_failure = self.active_failure_count > 0;
    }

    /// Apply the resolve delta.
    pub fn release_active_failure(&mut self) {
        self.active_failure_count = release_one(self.active_failure_count);
        self.has_active_failure = self.active_failure_count > 0;
    }

    /// Overwrite the failure fields with a full recount.
    pub fn apply_reconciliation(&mut self, summary: &FailureSummary) {
        self.active_failure_count = summary.active_failure_count;
        self.has_active_failure = summary.has_active_failure;
        self.last_failure_at = summary.last_failure_at;
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// The failure-relevant columns of one crit walk, as read during a recount.
#[derive(Debug, Clone, Copy)]
pub struct FailureSample {
    pub completed_at: Timestamp,
    pub has_failure: bool,
    pub failure_resolved_at: Option<Timestamp>,
}

/// Failure fields recomputed from the authoritative crit walk log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureSummary {
    pub active_failure_count: i32,
    pub has_active_failure: bool,
    pub last_failure_at: Option<Timestamp>,
}

impl FailureSummary {
    /// Recount every sample. O(n) in the number of crit walks.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = FailureSample>,
    {
        let mut active_failure_count = 0i32;
        let mut last_failure_at: Option<Timestamp> = None;

        for sample in samples {
            if !sample.has_failure {
                continue;
            }
            if sample.failure_resolved_at.is_none() {
                active_failure_count += 1;
            }
            last_failure_at = Some(match last_failure_at {
                Some(last) => last.max(sample.completed_at),
                None => sample.completed_at,
            });
        }

        Self {
            active_failure_count,
            has_active_failure: active_failure_count > 0,
            last_failure_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
