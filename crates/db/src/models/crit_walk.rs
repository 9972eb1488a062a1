//! Crit walk (inspection record) models: the walk itself, its photos and
//! its comment thread.

use critwalk_core::failure_tracking::{FailureFields, FailureSample, FailureState};
use critwalk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `crit_walks` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CritWalk {
    pub id: DbId,
    pub equipment_id: DbId,
    pub equipment_name: String,
    pub technician_name: String,
    pub completed_at: Timestamp,
    pub notes: Option<String>,
    pub has_failure: bool,
    pub work_order_number: Option<String>,
    pub failure_resolved_at: Option<Timestamp>,
    pub failure_resolved_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CritWalk {
    pub fn failure_fields(&self) -> FailureFields {
        FailureFields {
            has_failure: self.has_failure,
            work_order_number: self.work_order_number.clone(),
            failure_resolved_at: self.failure_resolved_at,
            failure_resolved_by: self.failure_resolved_by.clone(),
        }
    }

    pub fn failure_state(&self) -> FailureState {
        FailureState::of(self.has_failure, self.failure_resolved_at)
    }

    pub fn failure_sample(&self) -> FailureSample {
        FailureSample {
            completed_at: self.completed_at,
            has_failure: self.has_failure,
            failure_resolved_at: self.failure_resolved_at,
        }
    }

    /// Overwrite the failure columns.
    pub fn apply_failure_fields(&mut self, fields: FailureFields, updated_at: Timestamp) {
        self.has_failure = fields.has_failure;
        self.work_order_number = fields.work_order_number;
        self.failure_resolved_at = fields.failure_resolved_at;
        self.failure_resolved_by = fields.failure_resolved_by;
        self.updated_at = updated_at;
    }
}

/// DTO for inserting a crit walk. Photos are attached afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCritWalk {
    pub equipment_id: DbId,
    pub equipment_name: String,
    pub technician_name: String,
    pub notes: Option<String>,
    pub has_failure: bool,
    pub work_order_number: Option<String>,
}

/// A row from the `crit_walk_photos` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CritWalkPhoto {
    pub id: DbId,
    pub crit_walk_id: DbId,
    pub storage_url: String,
    pub storage_path: String,
    pub position: i32,
    pub uploaded_at: Timestamp,
}

/// DTO for attaching an uploaded photo to a crit walk.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCritWalkPhoto {
    pub storage_url: String,
    pub storage_path: String,
    pub position: i32,
}

/// A row from the `crit_walk_comments` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CritWalkComment {
    pub id: DbId,
    pub crit_walk_id: DbId,
    pub text: String,
    pub created_by: String,
    pub created_at: Timestamp,
}

/// DTO for appending a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCritWalkComment {
    pub text: String,
    pub created_by: String,
}

/// A crit walk together with its photos (by position) and comments (oldest
/// first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CritWalkDetail {
    #[serde(flatten)]
    pub walk: CritWalk,
    pub photos: Vec<CritWalkPhoto>,
    pub comments: Vec<CritWalkComment>,
}
