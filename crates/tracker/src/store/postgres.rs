//! Postgres-backed [`InspectionStore`].

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
use critwalk_db::repositories::{
    AssignmentRepo, CritWalkCommentRepo, CritWalkPhotoRepo, CritWalkRepo, EquipmentRepo,
    EquipmentStatusRepo,
};
use critwalk_db::DbPool;

use super::{InspectionStore, StoreResult};

/// Delegates every call to the `critwalk-db` repositories.
#[derive(Clone)]
pub struct PgInspectionStore {
    pool: DbPool,
}

impl PgInspectionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl InspectionStore for PgInspectionStore {
    async fn create_equipment(
        &self,
        created_by: &str,
        input: &CreateEquipment,
    ) -> StoreResult<Equipment> {
        Ok(EquipmentRepo::create(&self.pool, created_by, input).await?)
    }

    async fn find_equipment(&self, id: DbId) -> StoreResult<Option<Equipment>> {
        Ok(EquipmentRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_active_equipment(&self) -> StoreResult<Vec<Equipment>> {
        Ok(EquipmentRepo::list_active(&self.pool).await?)
    }

    async fn list_equipment_ids(&self) -> StoreResult<Vec<DbId>> {
        Ok(EquipmentRepo::list_ids(&self.pool).await?)
    }

    async fn update_equipment(
        &self,
        id: DbId,
        input: &UpdateEquipment,
    ) -> StoreResult<Option<Equipment>> {
        Ok(EquipmentRepo::update(&self.pool, id, input).await?)
    }

    async fn deactivate_equipment(&self, id: DbId) -> StoreResult<bool> {
        Ok(EquipmentRepo::deactivate(&self.pool, id).await?)
    }

    async fn find_status(&self, equipment_id: DbId) -> StoreResult<Option<EquipmentStatusRow>> {
        Ok(EquipmentStatusRepo::find_by_equipment(&self.pool, equipment_id).await?)
    }

    async fn list_active_statuses(&self) -> StoreResult<Vec<EquipmentStatusRow>> {
        Ok(EquipmentStatusRepo::list_active(&self.pool).await?)
    }

    async fn reconcile_failures(
        &self,
        equipment_id: DbId,
    ) -> StoreResult<Option<EquipmentStatusRow>> {
        Ok(EquipmentStatusRepo::reconcile(&self.pool, equipment_id).await?)
    }

    async fn record_crit_walk(&self, input: &CreateCritWalk) -> StoreResult<CritWalkWithStatus> {
        Ok(EquipmentStatusRepo::record_crit_walk(&self.pool, input).await?)
    }

    async fn find_crit_walk(
        &self,
        equipment_id: DbId,
        id: DbId,
    ) -> StoreResult<Option<CritWalk>> {
        Ok(CritWalkRepo::find_by_id(&self.pool, equipment_id, id).await?)
    }

    async fn list_crit_walks(&self, equipment_id: DbId, limit: i64) -> StoreResult<Vec<CritWalk>> {
        Ok(CritWalkRepo::list_by_equipment(&self.pool, equipment_id, limit).await?)
    }

    async fn list_crit_walks_before(
        &self,
        equipment_id: DbId,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CritWalk>> {
        Ok(CritWalkRepo::list_completed_before(&self.pool, equipment_id, cutoff).await?)
    }

    async fn update_failure_fields(
        &self,
        id: DbId,
        fields: &FailureFields,
    ) -> StoreResult<Option<CritWalk>> {
        Ok(CritWalkRepo::update_failure_fields(&self.pool, id, fields).await?)
    }

    async fn resolve_crit_walk(
        &self,
        equipment_id: DbId,
        id: DbId,
        resolved_by: &str,
        resolved_at: Timestamp,
    ) -> StoreResult<Option<CritWalkWithStatus>> {
        Ok(EquipmentStatusRepo::resolve_crit_walk(
            &self.pool,
            equipment_id,
            id,
            resolved_by,
            resolved_at,
        )
        .await?)
    }

    async fn delete_crit_walk(&self, id: DbId) -> StoreResult<bool> {
        Ok(CritWalkRepo::delete(&self.pool, id).await?)
    }

    async fn append_photos(
        &self,
        crit_walk_id: DbId,
        photos: &[CreateCritWalkPhoto],
    ) -> StoreResult<Vec<CritWalkPhoto>> {
        Ok(CritWalkPhotoRepo::append(&self.pool, crit_walk_id, photos).await?)
    }

    async fn list_photos(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkPhoto>> {
        Ok(CritWalkPhotoRepo::list_by_crit_walk(&self.pool, crit_walk_id).await?)
    }

    async fn append_comment(
        &self,
        crit_walk_id: DbId,
        input: &CreateCritWalkComment,
    ) -> StoreResult<CritWalkComment> {
        Ok(CritWalkCommentRepo::create(&self.pool, crit_walk_id, input).await?)
    }

    async fn list_comments(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkComment>> {
        Ok(CritWalkCommentRepo::list_by_crit_walk(&self.pool, crit_walk_id).await?)
    }

    async fn create_assignment(&self, input: &CreateAssignment) -> StoreResult<Assignment> {
        Ok(AssignmentRepo::create(&self.pool, input).await?)
    }

    async fn find_assignment(&self, id: DbId) -> StoreResult<Option<Assignment>> {
        Ok(AssignmentRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_pending_assignments(
        &self,
        technician_name: &str,
    ) -> StoreResult<Vec<Assignment>> {
        Ok(AssignmentRepo::list_pending_by_technician(&self.pool, technician_name).await?)
    }

    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>> {
        Ok(AssignmentRepo::list_all(&self.pool).await?)
    }

    async fn complete_assignment(
        &self,
        id: DbId,
        crit_walk_id: DbId,
    ) -> StoreResult<Option<Assignment>> {
        Ok(AssignmentRepo::complete(&self.pool, id, crit_walk_id).await?)
    }

    async fn mark_overdue_assignments(&self, now: Timestamp) -> StoreResult<Vec<Assignment>> {
        Ok(AssignmentRepo::mark_overdue(&self.pool, now).await?)
    }
}
