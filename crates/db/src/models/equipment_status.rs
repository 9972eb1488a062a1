//! Equipment status summary model.
//!
//! The stored row holds only denormalized counters. The staleness colour is
//! attached at read time through [`EquipmentStatusRow::view_at`].

use critwalk_core::failure_tracking::StatusAggregate;
use critwalk_core::status::{classify_at, hours_since, StatusColor};
use critwalk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::crit_walk::CritWalk;

/// A row from the `equipment_statuses` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EquipmentStatusRow {
    pub id: DbId,
    pub equipment_id: DbId,
    pub last_crit_walk_at: Option<Timestamp>,
    pub last_crit_walk_by: Option<String>,
    pub total_walks_completed: i64,
    pub has_active_failure: bool,
    pub active_failure_count: i32,
    pub last_failure_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl EquipmentStatusRow {
    /// The counter columns as a core aggregate.
    pub fn aggregate(&self) -> StatusAggregate {
        StatusAggregate {
            last_crit_walk_at: self.last_crit_walk_at,
            last_crit_walk_by: self.last_crit_walk_by.clone(),
            total_walks_completed: self.total_walks_completed,
            has_active_failure: self.has_active_failure,
            active_failure_count: self.active_failure_count,
            last_failure_at: self.last_failure_at,
        }
    }

    /// Overwrite the counter columns from a core aggregate.
    pub fn apply_aggregate(&mut self, aggregate: StatusAggregate, updated_at: Timestamp) {
        self.last_crit_walk_at = aggregate.last_crit_walk_at;
        self.last_crit_walk_by = aggregate.last_crit_walk_by;
        self.total_walks_completed = aggregate.total_walks_completed;
        self.has_active_failure = aggregate.has_active_failure;
        self.active_failure_count = aggregate.active_failure_count;
        self.last_failure_at = aggregate.last_failure_at;
        self.updated_at = updated_at;
    }

    /// Attach a live staleness classification computed against `now`.
    pub fn view_at(&self, now: Timestamp) -> EquipmentStatusView {
        EquipmentStatusView {
            equipment_id: self.equipment_id,
            last_crit_walk_at: self.last_crit_walk_at,
            last_crit_walk_by: self.last_crit_walk_by.clone(),
            total_walks_completed: self.total_walks_completed,
            has_active_failure: self.has_active_failure,
            active_failure_count: self.active_failure_count,
            last_failure_at: self.last_failure_at,
            status: classify_at(self.last_crit_walk_at, now),
            hours_since_last_walk: hours_since(self.last_crit_walk_at, now),
        }
    }
}

/// Read model combining the stored counters with the live status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentStatusView {
    pub equipment_id: DbId,
    pub last_crit_walk_at: Option<Timestamp>,
    pub last_crit_walk_by: Option<String>,
    pub total_walks_completed: i64,
    pub has_active_failure: bool,
    pub active_failure_count: i32,
    pub last_failure_at: Option<Timestamp>,
    pub status: StatusColor,
    pub hours_since_last_walk: Option<f64>,
}

/// A crit walk write together with the summary it produced.
///
/// `status` is `None` when the equipment has no summary row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CritWalkWithStatus {
    pub crit_walk: CritWalk,
    pub status: Option<EquipmentStatusRow>,
}
