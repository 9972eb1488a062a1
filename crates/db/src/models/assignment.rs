//! Crit walk assignment model.

use critwalk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ASSIGNMENT_PENDING: &str = "pending";
pub const ASSIGNMENT_COMPLETED: &str = "completed";
pub const ASSIGNMENT_OVERDUE: &str = "overdue";

/// A row from the `assignments` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Assignment {
    pub id: DbId,
    pub equipment_id: DbId,
    pub equipment_name: String,
    pub technician_name: String,
    pub assigned_by: String,
    pub assigned_at: Timestamp,
    pub due_by: Option<Timestamp>,
    pub status: String,
    pub completed_at: Option<Timestamp>,
    pub crit_walk_id: Option<DbId>,
}

impl Assignment {
    pub fn is_pending(&self) -> bool {
        self.status == ASSIGNMENT_PENDING
    }

    /// Pending or overdue: still waiting for its crit walk.
    pub fn is_open(&self) -> bool {
        self.status == ASSIGNMENT_PENDING || self.status == ASSIGNMENT_OVERDUE
    }

    /// Open and past its due date at `now`.
    pub fn is_past_due(&self, now: Timestamp) -> bool {
        self.is_open() && self.due_by.is_some_and(|due| due < now)
    }
}

/// DTO for creating an assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignment {
    pub equipment_id: DbId,
    pub equipment_name: String,
    pub technician_name: String,
    pub assigned_by: String,
    pub due_by: Option<Timestamp>,
}
