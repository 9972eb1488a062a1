//! Crit walk operations.
//!
//! [`CritWalkTracker`] records crit walks, drives the failure lifecycle and
//! keeps each equipment's status summary in step with the crit walk log.
//! Every operation takes an explicit [`Session`] where identity or role
//! matters.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use critwalk_core::crit_walk::{
    clamp_history_limit, validate_comment, validate_crit_walk, CritWalkFields,
};
use critwalk_core::equipment::validate_equipment;
use critwalk_core::error::CoreError;
use critwalk_core::retention::retention_cutoff;
use critwalk_core::roles::Session;
use critwalk_core::storage::{photo_file_name, photo_path};
use critwalk_core::types::{DbId, Timestamp};
use critwalk_db::models::assignment::{Assignment, CreateAssignment};
use critwalk_db::models::crit_walk::{
    CreateCritWalk, CreateCritWalkComment, CreateCritWalkPhoto, CritWalk, CritWalkComment,
    CritWalkDetail, CritWalkPhoto,
};
use critwalk_db::models::equipment::{CreateEquipment, Equipment, UpdateEquipment};
use critwalk_db::models::equipment_status::{EquipmentStatusRow, EquipmentStatusView};
use serde::Serialize;

use crate::blob::BlobStore;
use crate::config::{SummaryFailurePolicy, TrackerConfig};
use crate::error::{PhotoUploadFailure, TrackerError, TrackerResult};
use crate::retention::{sweep, SweepReport};
use crate::retry::CallPolicy;
use crate::store::InspectionStore;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One photo of a crit walk submission.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Original file name; only its extension is kept.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything a technician submits for one crit walk.
#[derive(Debug, Clone, Default)]
pub struct CreateCritWalkRequest {
    pub equipment_id: DbId,
    pub notes: Option<String>,
    pub has_failure: bool,
    pub work_order_number: Option<String>,
    pub photos: Vec<PhotoUpload>,
    /// Pending assignment this walk fulfils, if any.
    pub assignment_id: Option<DbId>,
}

/// Result of recording a crit walk.
///
/// The record exists whenever an outcome is returned, even if some photos
/// failed to upload; use [`CreateCritWalkOutcome::into_result`] to surface
/// those as [`TrackerError::PartialUpload`].
#[derive(Debug, Clone, Serialize)]
pub struct CreateCritWalkOutcome {
    pub crit_walk: CritWalk,
    pub photos: Vec<CritWalkPhoto>,
    pub failed_photos: Vec<PhotoUploadFailure>,
    /// `None` when the summary update failed and the policy swallowed it.
    pub status: Option<EquipmentStatusView>,
    pub assignment: Option<Assignment>,
}

impl CreateCritWalkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_photos.is_empty()
    }

    /// `Err(PartialUpload)` if any photo is missing, otherwise the outcome.
    pub fn into_result(self) -> TrackerResult<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(TrackerError::PartialUpload {
            crit_walk_id: self.crit_walk.id,
            uploaded: self.photos.len(),
            failed: self.failed_photos,
        })
    }
}

/// A crit walk after a failure lifecycle change, with the resulting summary.
#[derive(Debug, Clone, Serialize)]
pub struct FailureUpdate {
    pub crit_walk: CritWalk,
    pub status: Option<EquipmentStatusView>,
}

/// One row of the equipment dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    pub equipment: Equipment,
    pub status: Option<EquipmentStatusView>,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Crit walk tracker over a document store and a blob store.
pub struct CritWalkTracker<S, B> {
    store: S,
    blobs: B,
    config: TrackerConfig,
    policy: CallPolicy,
}

impl<S, B> CritWalkTracker<S, B>
where
    S: InspectionStore,
    B: BlobStore,
{
    pub fn new(store: S, blobs: B, config: TrackerConfig) -> Self {
        let policy = config.call_policy();
        Self {
            store,
            blobs,
            config,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // -- Crit walks ---------------------------------------------------------

    /// Record a crit walk.
    ///
    /// The record and its status summary delta are written together so the
    /// record has a stable id. Photos are then uploaded concurrently; a
    /// failed upload never removes the record or the other photos. Finally
    /// the optional assignment is completed.
    pub async fn create_crit_walk(
        &self,
        session: &Session,
        request: CreateCritWalkRequest,
    ) -> TrackerResult<CreateCritWalkOutcome> {
        let work_order_number = request
            .work_order_number
            .filter(|wo| !wo.trim().is_empty());
        validate_crit_walk(
            &CritWalkFields {
                technician_name: &session.name,
                notes: request.notes.as_deref(),
                work_order_number: work_order_number.as_deref(),
            },
            request.has_failure,
            request.photos.len(),
        )?;

        let equipment = self.active_equipment(request.equipment_id).await?;
        if let Some(assignment_id) = request.assignment_id {
            self.pending_assignment_for(assignment_id, equipment.id)
                .await?;
        }

        let input = CreateCritWalk {
            equipment_id: equipment.id,
            equipment_name: equipment.name.clone(),
            technician_name: session.name.clone(),
            notes: request.notes,
            has_failure: request.has_failure,
            work_order_number,
        };
        let recorded = self
            .policy
            .once("record_crit_walk", || self.store.record_crit_walk(&input))
            .await?;
        let crit_walk = recorded.crit_walk;
        let status = self.settle_summary("record_crit_walk", equipment.id, Ok(recorded.status))?;

        let (photos, failed_photos) = self.upload_photos(&crit_walk, &request.photos).await;

        let assignment = match request.assignment_id {
            Some(assignment_id) => self.complete_assignment(assignment_id, crit_walk.id).await,
            None => None,
        };

        tracing::info!(
            equipment_id = equipment.id,
            crit_walk_id = crit_walk.id,
            technician = %crit_walk.technician_name,
            has_failure = crit_walk.has_failure,
            photos = photos.len(),
            failed_photos = failed_photos.len(),
            "Crit walk recorded"
        );

        Ok(CreateCritWalkOutcome {
            crit_walk,
            photos,
            failed_photos,
            status,
            assignment,
        })
    }

    /// Upload every photo concurrently and attach the successful ones.
    async fn upload_photos(
        &self,
        crit_walk: &CritWalk,
        uploads: &[PhotoUpload],
    ) -> (Vec<CritWalkPhoto>, Vec<PhotoUploadFailure>) {
        if uploads.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let batch_millis = Utc::now().timestamp_millis();
        let pending = uploads.iter().enumerate().map(|(index, upload)| {
            let extension = Path::new(&upload.file_name)
                .extension()
                .and_then(|ext| ext.to_str());
            let path = photo_path(
                crit_walk.equipment_id,
                crit_walk.id,
                &photo_file_name(batch_millis, index, extension),
            );
            async move {
                let result = self
                    .policy
                    .retrying("put_photo", || {
                        self.blobs.put(&path, &upload.bytes, &upload.content_type)
                    })
                    .await;
                (index, path, result)
            }
        });

        let mut stored = Vec::new();
        let mut failed = Vec::new();
        for (index, path, result) in futures::future::join_all(pending).await {
            match result {
                Ok(storage_url) => stored.push(CreateCritWalkPhoto {
                    storage_url,
                    storage_path: path,
                    position: index as i32,
                }),
                Err(e) => {
                    tracing::warn!(
                        crit_walk_id = crit_walk.id,
                        index,
                        path = %path,
                        error = %e,
                        "Photo upload failed"
                    );
                    failed.push(PhotoUploadFailure {
                        index,
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if stored.is_empty() {
            return (Vec::new(), failed);
        }

        match self
            .policy
            .once("append_photos", || {
                self.store.append_photos(crit_walk.id, &stored)
            })
            .await
        {
            Ok(photos) => (photos, failed),
            Err(e) => {
                tracing::error!(
                    crit_walk_id = crit_walk.id,
                    count = stored.len(),
                    error = %e,
                    "Uploaded photos could not be attached to the crit walk"
                );
                let reason = e.to_string();
                failed.extend(stored.into_iter().map(|photo| PhotoUploadFailure {
                    index: photo.position as usize,
                    path: photo.storage_path,
                    reason: reason.clone(),
                }));
                failed.sort_by_key(|f| f.index);
                (Vec::new(), failed)
            }
        }
    }

    /// Mark the failure on a crit walk as resolved. Managers only.
    ///
    /// Resolving twice is a conflict; the first resolver is kept.
    pub async fn resolve_failure(
        &self,
        session: &Session,
        equipment_id: DbId,
        crit_walk_id: DbId,
    ) -> TrackerResult<FailureUpdate> {
        session.require_manager("resolve failures")?;

        let crit_walk = self.find_crit_walk(equipment_id, crit_walk_id).await?;
        let resolved_at = Utc::now();
        crit_walk
            .failure_fields()
            .resolve(&session.name, resolved_at)?;

        let resolved = self
            .policy
            .once("resolve_crit_walk", || {
                self.store
                    .resolve_crit_walk(equipment_id, crit_walk_id, &session.name, resolved_at)
            })
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Failure on crit walk {crit_walk_id} was resolved concurrently"
                ))
            })?;
        let status =
            self.settle_summary("resolve_crit_walk", equipment_id, Ok(resolved.status))?;

        tracing::info!(
            equipment_id,
            crit_walk_id,
            resolved_by = %session.name,
            "Failure resolved"
        );
        Ok(FailureUpdate {
            crit_walk: resolved.crit_walk,
            status,
        })
    }

    /// Change the failure flag and work order of a crit walk. Managers only.
    ///
    /// The summary is rebuilt from the full crit walk log afterwards, which
    /// also heals any drift left by earlier incremental updates.
    pub async fn edit_failure_details(
        &self,
        session: &Session,
        equipment_id: DbId,
        crit_walk_id: DbId,
        has_failure: bool,
        work_order_number: Option<String>,
    ) -> TrackerResult<FailureUpdate> {
        session.require_manager("edit failure details")?;

        let crit_walk = self.find_crit_walk(equipment_id, crit_walk_id).await?;
        let previous = crit_walk.failure_state();
        let work_order_number = work_order_number.filter(|wo| !wo.trim().is_empty());
        let fields = crit_walk
            .failure_fields()
            .edit(has_failure, work_order_number)?;

        let updated = self
            .policy
            .retrying("update_failure_fields", || {
                self.store.update_failure_fields(crit_walk_id, &fields)
            })
            .await?
            .ok_or_else(|| TrackerError::not_found("crit_walk", crit_walk_id))?;

        let summary = self
            .policy
            .retrying("reconcile_failures", || {
                self.store.reconcile_failures(equipment_id)
            })
            .await;
        let status = self.settle_summary("reconcile_failures", equipment_id, summary)?;

        tracing::info!(
            equipment_id,
            crit_walk_id,
            edited_by = %session.name,
            from = ?previous,
            to = ?updated.failure_state(),
            "Failure details edited"
        );
        Ok(FailureUpdate {
            crit_walk: updated,
            status,
        })
    }

    /// Append a comment to a crit walk. Any role may comment.
    pub async fn add_comment(
        &self,
        session: &Session,
        equipment_id: DbId,
        crit_walk_id: DbId,
        text: &str,
    ) -> TrackerResult<CritWalkComment> {
        validate_comment(text)?;
        self.find_crit_walk(equipment_id, crit_walk_id).await?;

        let input = CreateCritWalkComment {
            text: text.trim().to_string(),
            created_by: session.name.clone(),
        };
        let comment = self
            .policy
            .once("append_comment", || {
                self.store.append_comment(crit_walk_id, &input)
            })
            .await?;

        tracing::debug!(equipment_id, crit_walk_id, comment_id = comment.id, "Comment added");
        Ok(comment)
    }

    /// A crit walk with its photos and comments.
    pub async fn crit_walk(
        &self,
        equipment_id: DbId,
        crit_walk_id: DbId,
    ) -> TrackerResult<CritWalkDetail> {
        let walk = self.find_crit_walk(equipment_id, crit_walk_id).await?;
        let (photos, comments) = futures::try_join!(
            self.policy
                .retrying("list_photos", || self.store.list_photos(crit_walk_id)),
            self.policy
                .retrying("list_comments", || self.store.list_comments(crit_walk_id)),
        )?;
        Ok(CritWalkDetail {
            walk,
            photos,
            comments,
        })
    }

    /// Most recent crit walks of one equipment item, newest first.
    pub async fn history(
        &self,
        equipment_id: DbId,
        limit: Option<i64>,
    ) -> TrackerResult<Vec<CritWalk>> {
        let limit = clamp_history_limit(limit);
        self.policy
            .retrying("list_crit_walks", || {
                self.store.list_crit_walks(equipment_id, limit)
            })
            .await
    }

    // -- Status -------------------------------------------------------------

    /// Rebuild the failure fields of the summary from the crit walk log.
    pub async fn reconcile(&self, equipment_id: DbId) -> TrackerResult<EquipmentStatusView> {
        let row = self
            .policy
            .retrying("reconcile_failures", || {
                self.store.reconcile_failures(equipment_id)
            })
            .await?
            .ok_or_else(|| TrackerError::not_found("equipment", equipment_id))?;
        Ok(row.view_at(Utc::now()))
    }

    /// Status summary with a live classification.
    pub async fn equipment_status(&self, equipment_id: DbId) -> TrackerResult<EquipmentStatusView> {
        self.equipment_status_at(equipment_id, Utc::now()).await
    }

    /// Status summary classified against an explicit `now`.
    pub async fn equipment_status_at(
        &self,
        equipment_id: DbId,
        now: Timestamp,
    ) -> TrackerResult<EquipmentStatusView> {
        let row = self
            .policy
            .retrying("find_status", || self.store.find_status(equipment_id))
            .await?
            .ok_or_else(|| TrackerError::not_found("equipment", equipment_id))?;
        Ok(row.view_at(now))
    }

    /// Every active equipment item with its live status.
    pub async fn dashboard(&self) -> TrackerResult<Vec<DashboardEntry>> {
        self.dashboard_at(Utc::now()).await
    }

    pub async fn dashboard_at(&self, now: Timestamp) -> TrackerResult<Vec<DashboardEntry>> {
        let (equipment, statuses) = futures::try_join!(
            self.policy
                .retrying("list_active_equipment", || self.store.list_active_equipment()),
            self.policy
                .retrying("list_active_statuses", || self.store.list_active_statuses()),
        )?;

        let mut by_equipment: HashMap<DbId, EquipmentStatusRow> = statuses
            .into_iter()
            .map(|row| (row.equipment_id, row))
            .collect();

        Ok(equipment
            .into_iter()
            .map(|equipment| {
                let status = by_equipment
                    .remove(&equipment.id)
                    .map(|row| row.view_at(now));
                DashboardEntry { equipment, status }
            })
            .collect())
    }

    // -- Equipment ----------------------------------------------------------

    /// Register equipment with a zeroed status summary. Managers only.
    pub async fn create_equipment(
        &self,
        session: &Session,
        input: CreateEquipment,
    ) -> TrackerResult<Equipment> {
        session.require_manager("create equipment")?;
        validate_equipment(
            Some(&input.name),
            input.crit_walk_interval_hours,
            input.expected_photo_count,
        )?;
        let input = CreateEquipment {
            name: input.name.trim().to_string(),
            ..input
        };

        let equipment = self
            .policy
            .once("create_equipment", || {
                self.store.create_equipment(&session.name, &input)
            })
            .await?;

        tracing::info!(equipment_id = equipment.id, name = %equipment.name, "Equipment created");
        Ok(equipment)
    }

    /// Update equipment fields. Managers only.
    pub async fn update_equipment(
        &self,
        session: &Session,
        equipment_id: DbId,
        input: UpdateEquipment,
    ) -> TrackerResult<Equipment> {
        session.require_manager("edit equipment")?;
        validate_equipment(
            input.name.as_deref(),
            input.crit_walk_interval_hours,
            input.expected_photo_count,
        )?;
        let input = UpdateEquipment {
            name: input.name.map(|name| name.trim().to_string()),
            ..input
        };

        self.policy
            .retrying("update_equipment", || {
                self.store.update_equipment(equipment_id, &input)
            })
            .await?
            .ok_or_else(|| TrackerError::not_found("equipment", equipment_id))
    }

    /// Hide equipment from the dashboard. Managers only. Its crit walks stay.
    pub async fn deactivate_equipment(
        &self,
        session: &Session,
        equipment_id: DbId,
    ) -> TrackerResult<()> {
        session.require_manager("deactivate equipment")?;
        let deactivated = self
            .policy
            .retrying("deactivate_equipment", || {
                self.store.deactivate_equipment(equipment_id)
            })
            .await?;
        if !deactivated {
            // Either missing or already inactive; only the former is an error.
            self.equipment(equipment_id).await?;
        }
        tracing::info!(equipment_id, "Equipment deactivated");
        Ok(())
    }

    pub async fn equipment(&self, equipment_id: DbId) -> TrackerResult<Equipment> {
        self.policy
            .retrying("find_equipment", || self.store.find_equipment(equipment_id))
            .await?
            .ok_or_else(|| TrackerError::not_found("equipment", equipment_id))
    }

    pub async fn list_equipment(&self) -> TrackerResult<Vec<Equipment>> {
        self.policy
            .retrying("list_active_equipment", || self.store.list_active_equipment())
            .await
    }

    // -- Assignments --------------------------------------------------------

    /// Ask a technician to walk an equipment item. Managers only.
    pub async fn assign_crit_walk(
        &self,
        session: &Session,
        equipment_id: DbId,
        technician_name: &str,
        due_by: Option<Timestamp>,
    ) -> TrackerResult<Assignment> {
        session.require_manager("assign crit walks")?;
        let technician_name = technician_name.trim();
        if technician_name.is_empty() {
            return Err(CoreError::Validation("Technician name must not be blank".into()).into());
        }
        let equipment = self.active_equipment(equipment_id).await?;

        let input = CreateAssignment {
            equipment_id,
            equipment_name: equipment.name,
            technician_name: technician_name.to_string(),
            assigned_by: session.name.clone(),
            due_by,
        };
        let assignment = self
            .policy
            .once("create_assignment", || self.store.create_assignment(&input))
            .await?;

        tracing::info!(
            assignment_id = assignment.id,
            equipment_id,
            technician = %assignment.technician_name,
            "Crit walk assigned"
        );
        Ok(assignment)
    }

    /// Open assignments (pending or overdue) of the session's technician.
    pub async fn pending_assignments(&self, session: &Session) -> TrackerResult<Vec<Assignment>> {
        self.policy
            .retrying("list_pending_assignments", || {
                self.store.list_pending_assignments(&session.name)
            })
            .await
    }

    /// Every assignment. Managers only.
    pub async fn assignments(&self, session: &Session) -> TrackerResult<Vec<Assignment>> {
        session.require_manager("view all assignments")?;
        self.policy
            .retrying("list_assignments", || self.store.list_assignments())
            .await
    }

    /// Mark pending assignments whose due date has passed as overdue.
    ///
    /// Overdue assignments stay open and are still completed by their walk.
    pub async fn mark_overdue_assignments(&self, now: Timestamp) -> TrackerResult<Vec<Assignment>> {
        let overdue = self
            .policy
            .retrying("mark_overdue_assignments", || {
                self.store.mark_overdue_assignments(now)
            })
            .await?;
        for assignment in &overdue {
            tracing::info!(
                assignment_id = assignment.id,
                equipment_id = assignment.equipment_id,
                technician = %assignment.technician_name,
                due_by = ?assignment.due_by,
                "Assignment overdue"
            );
        }
        Ok(overdue)
    }

    // -- Retention ----------------------------------------------------------

    /// Delete crit walks (and their photos) older than the retention window.
    pub async fn sweep_expired(&self, now: Timestamp) -> TrackerResult<SweepReport> {
        let cutoff = retention_cutoff(now, self.config.retention_days);
        sweep(&self.store, &self.blobs, &self.policy, cutoff).await
    }

    // -- Helpers ------------------------------------------------------------

    async fn find_crit_walk(&self, equipment_id: DbId, crit_walk_id: DbId) -> TrackerResult<CritWalk> {
        self.policy
            .retrying("find_crit_walk", || {
                self.store.find_crit_walk(equipment_id, crit_walk_id)
            })
            .await?
            .ok_or_else(|| TrackerError::not_found("crit_walk", crit_walk_id))
    }

    async fn active_equipment(&self, equipment_id: DbId) -> TrackerResult<Equipment> {
        let equipment = self.equipment(equipment_id).await?;
        if !equipment.is_active {
            return Err(TrackerError::not_found("equipment", equipment_id));
        }
        Ok(equipment)
    }

    async fn pending_assignment_for(
        &self,
        assignment_id: DbId,
        equipment_id: DbId,
    ) -> TrackerResult<Assignment> {
        let assignment = self
            .policy
            .retrying("find_assignment", || self.store.find_assignment(assignment_id))
            .await?
            .ok_or_else(|| TrackerError::not_found("assignment", assignment_id))?;
        if assignment.equipment_id != equipment_id {
            return Err(CoreError::Validation(format!(
                "Assignment {assignment_id} is for equipment {}, not {equipment_id}",
                assignment.equipment_id
            ))
            .into());
        }
        if !assignment.is_open() {
            return Err(CoreError::Conflict(format!(
                "Assignment {assignment_id} is already {}",
                assignment.status
            ))
            .into());
        }
        Ok(assignment)
    }

    /// Close the assignment a walk fulfils. The walk is already recorded, so
    /// failures here are logged rather than returned.
    async fn complete_assignment(&self, assignment_id: DbId, crit_walk_id: DbId) -> Option<Assignment> {
        match self
            .policy
            .once("complete_assignment", || {
                self.store.complete_assignment(assignment_id, crit_walk_id)
            })
            .await
        {
            Ok(Some(assignment)) => Some(assignment),
            Ok(None) => {
                tracing::warn!(
                    assignment_id,
                    crit_walk_id,
                    "Assignment was no longer pending when the crit walk completed"
                );
                None
            }
            Err(e) => {
                tracing::warn!(assignment_id, crit_walk_id, error = %e, "Failed to complete assignment");
                None
            }
        }
    }

    /// Apply the summary failure policy to the result of a summary update.
    fn settle_summary(
        &self,
        operation: &'static str,
        equipment_id: DbId,
        result: TrackerResult<Option<EquipmentStatusRow>>,
    ) -> TrackerResult<Option<EquipmentStatusView>> {
        let error = match result {
            Ok(Some(row)) => return Ok(Some(row.view_at(Utc::now()))),
            Ok(None) => TrackerError::not_found("equipment_status", equipment_id),
            Err(e) => e,
        };

        tracing::error!(
            equipment_id,
            operation,
            error = %error,
            "Equipment status summary update failed"
        );
        match self.config.summary_failure_policy {
            SummaryFailurePolicy::LogAndContinue => Ok(None),
            SummaryFailurePolicy::Propagate => Err(error),
        }
    }
}
