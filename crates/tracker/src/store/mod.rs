//! Document store seam.
//!
//! [`InspectionStore`] is everything the tracker needs from persistence:
//! equipment, crit walks with their photos and comments, the per-equipment
//! status summary, and assignments. [`PgInspectionStore`] is the production
//! implementation; [`MemoryInspectionStore`] backs tests and local runs.
//!
//! The store clock is authoritative: `completed_at` and other creation
//! timestamps are assigned by the implementation, never by callers.

mod memory;
mod postgres;

pub use memory::MemoryInspectionStore;
pub use postgres::PgInspectionStore;

use async_trait::async_trait;
use critwalk_core::failure_tracking::FailureFields;
use critwalk_core::types::{DbId, Timestamp};
use critwalk_db::models::assignment::{Assignment, CreateAssignment};
use critwalk_db::models::crit_walk::{
    CreateCritWalk, CreateCritWalkComment, CreateCritWalkPhoto, CritWalk, CritWalkComment,
    CritWalkPhoto,
};
use critwalk_db::models::equipment::{CreateEquipment, Equipment, UpdateEquipment};
use critwalk_db::models::equipment_status::{CritWalkWithStatus, EquipmentStatusRow};

use crate::retry::Retryable;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors raised by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing service could not be reached. Always worth retrying.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the write (constraint violation and the like).
    #[error("Store rejected write: {0}")]
    Rejected(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::Unavailable(_) => true,
            StoreError::Rejected(_) => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence operations required by the crit walk tracker.
///
/// `record_crit_walk`, `resolve_crit_walk` and `reconcile_failures` are
/// linearized per equipment: each writes the crit walk log and the summary
/// under one hold of the summary row, so a recount never observes a walk
/// write whose delta has not been applied yet.
/// Methods returning `Option` yield `None` when the target row is absent.
#[async_trait]
pub trait InspectionStore: Send + Sync {
    // -- Equipment --

    /// Insert equipment together with a zeroed status summary.
    async fn create_equipment(
        &self,
        created_by: &str,
        input: &CreateEquipment,
    ) -> StoreResult<Equipment>;
    async fn find_equipment(&self, id: DbId) -> StoreResult<Option<Equipment>>;
    async fn list_active_equipment(&self) -> StoreResult<Vec<Equipment>>;
    /// Every equipment id, active or not.
    async fn list_equipment_ids(&self) -> StoreResult<Vec<DbId>>;
    async fn update_equipment(
        &self,
        id: DbId,
        input: &UpdateEquipment,
    ) -> StoreResult<Option<Equipment>>;
    async fn deactivate_equipment(&self, id: DbId) -> StoreResult<bool>;

    // -- Status summary --

    async fn find_status(&self, equipment_id: DbId) -> StoreResult<Option<EquipmentStatusRow>>;
    async fn list_active_statuses(&self) -> StoreResult<Vec<EquipmentStatusRow>>;
    async fn reconcile_failures(
        &self,
        equipment_id: DbId,
    ) -> StoreResult<Option<EquipmentStatusRow>>;

    // -- Crit walks --

    /// Insert a crit walk and apply its create delta atomically.
    async fn record_crit_walk(&self, input: &CreateCritWalk) -> StoreResult<CritWalkWithStatus>;
    async fn find_crit_walk(&self, equipment_id: DbId, id: DbId)
        -> StoreResult<Option<CritWalk>>;
    /// Newest first, at most `limit` rows.
    async fn list_crit_walks(&self, equipment_id: DbId, limit: i64) -> StoreResult<Vec<CritWalk>>;
    /// Walks completed strictly before `cutoff`, oldest first.
    async fn list_crit_walks_before(
        &self,
        equipment_id: DbId,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CritWalk>>;
    async fn update_failure_fields(
        &self,
        id: DbId,
        fields: &FailureFields,
    ) -> StoreResult<Option<CritWalk>>;
    /// Resolve a flagged walk and release its active failure atomically.
    /// `None`, with nothing written, unless the walk is currently flagged.
    async fn resolve_crit_walk(
        &self,
        equipment_id: DbId,
        id: DbId,
        resolved_by: &str,
        resolved_at: Timestamp,
    ) -> StoreResult<Option<CritWalkWithStatus>>;
    /// Remove a walk with its photo and comment rows.
    async fn delete_crit_walk(&self, id: DbId) -> StoreResult<bool>;

    // -- Photos and comments --

    async fn append_photos(
        &self,
        crit_walk_id: DbId,
        photos: &[CreateCritWalkPhoto],
    ) -> StoreResult<Vec<CritWalkPhoto>>;
    async fn list_photos(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkPhoto>>;
    async fn append_comment(
        &self,
        crit_walk_id: DbId,
        input: &CreateCritWalkComment,
    ) -> StoreResult<CritWalkComment>;
    async fn list_comments(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkComment>>;

    // -- Assignments --

    async fn create_assignment(&self, input: &CreateAssignment) -> StoreResult<Assignment>;
    async fn find_assignment(&self, id: DbId) -> StoreResult<Option<Assignment>>;
    async fn list_pending_assignments(&self, technician_name: &str)
        -> StoreResult<Vec<Assignment>>;
    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>>;
    /// Mark an open assignment completed. `None` if absent or already completed.
    async fn complete_assignment(
        &self,
        id: DbId,
        crit_walk_id: DbId,
    ) -> StoreResult<Option<Assignment>>;
    /// Mark pending assignments due before `now` overdue and return them.
    async fn mark_overdue_assignments(&self, now: Timestamp) -> StoreResult<Vec<Assignment>>;
}
