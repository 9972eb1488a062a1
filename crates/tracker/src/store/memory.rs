//! In-memory [`InspectionStore`] for tests and local runs.
//!
//! Each read-modify-write happens under one mutex, which gives the same
//! atomicity the Postgres store gets from single-statement updates and row
//! locks. A crit walk write and its summary delta share one guard. The
//! store owns a clock that tests can pin or advance, plus
//! per-operation failure and latency injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use critwalk_core::equipment::DEFAULT_CRIT_WALK_INTERVAL_HOURS;
use critwalk_core::failure_tracking::{FailureFields, FailureSummary, StatusAggregate, WalkRecorded};
use critwalk_core::types::{DbId, Timestamp};
use critwalk_db::models::assignment::{
    Assignment, CreateAssignment, ASSIGNMENT_COMPLETED, ASSIGNMENT_OVERDUE, ASSIGNMENT_PENDING,
};
use critwalk_db::models::crit_walk::{
    CreateCritWalk, CreateCritWalkComment, CreateCritWalkPhoto, CritWalk, CritWalkComment,
    CritWalkPhoto,
};
use critwalk_db::models::equipment::{CreateEquipment, Equipment, UpdateEquipment};
use critwalk_db::models::equipment_status::{CritWalkWithStatus, EquipmentStatusRow};

use super::{InspectionStore, StoreError, StoreResult};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    /// Pinned clock; `None` follows the wall clock.
    clock: Option<Timestamp>,
    next_id: DbId,
    equipment: BTreeMap<DbId, Equipment>,
    /// Keyed by equipment id.
    statuses: BTreeMap<DbId, EquipmentStatusRow>,
    walks: BTreeMap<DbId, CritWalk>,
    photos: BTreeMap<DbId, CritWalkPhoto>,
    comments: BTreeMap<DbId, CritWalkComment>,
    assignments: BTreeMap<DbId, Assignment>,
    failures: HashMap<&'static str, u32>,
    latency: HashMap<&'static str, Duration>,
}

impl MemoryState {
    fn now(&self) -> Timestamp {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn walk_exists(&self, crit_walk_id: DbId) -> StoreResult<()> {
        if self.walks.contains_key(&crit_walk_id) {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!(
                "crit walk {crit_walk_id} does not exist"
            )))
        }
    }

    /// Apply `change` to the summary row of `equipment_id`.
    fn update_status<F>(&mut self, equipment_id: DbId, change: F) -> Option<EquipmentStatusRow>
    where
        F: FnOnce(&mut StatusAggregate, &[&CritWalk]),
    {
        let now = self.now();
        let walks: Vec<&CritWalk> = self
            .walks
            .values()
            .filter(|w| w.equipment_id == equipment_id)
            .collect();
        let row = self.statuses.get_mut(&equipment_id)?;
        let mut aggregate = row.aggregate();
        change(&mut aggregate, &walks);
        row.apply_aggregate(aggregate, now);
        Some(row.clone())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Thread-safe in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryInspectionStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryInspectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume any injected latency or failure for `operation`.
    async fn enter(&self, operation: &'static str) -> StoreResult<()> {
        let (latency, fail) = {
            let mut state = self.lock();
            let latency = state.latency.get(operation).copied();
            let fail = match state.failures.get_mut(operation) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            (latency, fail)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(StoreError::Unavailable(format!(
                "injected failure in {operation}"
            )));
        }
        Ok(())
    }

    /// Pin the store clock.
    pub fn set_now(&self, now: Timestamp) {
        self.lock().clock = Some(now);
    }

    /// Move the store clock forward, pinning it first if needed.
    pub fn advance(&self, by: chrono::Duration) {
        let mut state = self.lock();
        let now = state.now();
        state.clock = Some(now + by);
    }

    /// Current store time.
    pub fn now(&self) -> Timestamp {
        self.lock().now()
    }

    /// Make the next `times` calls to `operation` fail with a retryable error.
    pub fn fail_next(&self, operation: &'static str, times: u32) {
        self.lock().failures.insert(operation, times);
    }

    /// Delay every call to `operation` by `latency`.
    pub fn set_latency(&self, operation: &'static str, latency: Duration) {
        self.lock().latency.insert(operation, latency);
    }

    /// Overwrite the stored active failure count, simulating drift.
    pub fn force_active_failure_count(&self, equipment_id: DbId, count: i32) {
        if let Some(row) = self.lock().statuses.get_mut(&equipment_id) {
            row.active_failure_count = count;
            row.has_active_failure = count > 0;
        }
    }
}

#[async_trait]
impl InspectionStore for MemoryInspectionStore {
    async fn create_equipment(
        &self,
        created_by: &str,
        input: &CreateEquipment,
    ) -> StoreResult<Equipment> {
        self.enter("create_equipment").await?;
        let mut state = self.lock();
        let now = state.now();
        let id = state.next_id();
        let equipment = Equipment {
            id,
            name: input.name.clone(),
            description: input.description.clone().unwrap_or_default(),
            location: input.location.clone().unwrap_or_default(),
            category: input.category.clone().unwrap_or_default(),
            created_by: created_by.to_string(),
            is_active: true,
            crit_walk_interval_hours: input
                .crit_walk_interval_hours
                .unwrap_or(DEFAULT_CRIT_WALK_INTERVAL_HOURS),
            expected_photo_count: input.expected_photo_count.unwrap_or(1),
            photo_guidelines: input.photo_guidelines.clone(),
            tags: input.tags.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let status_id = state.next_id();
        let status = EquipmentStatusRow {
            id: status_id,
            equipment_id: id,
            last_crit_walk_at: None,
            last_crit_walk_by: None,
            total_walks_completed: 0,
            has_active_failure: false,
            active_failure_count: 0,
            last_failure_at: None,
            updated_at: now,
        };
        state.statuses.insert(id, status);
        state.equipment.insert(id, equipment.clone());
        Ok(equipment)
    }

    async fn find_equipment(&self, id: DbId) -> StoreResult<Option<Equipment>> {
        self.enter("find_equipment").await?;
        Ok(self.lock().equipment.get(&id).cloned())
    }

    async fn list_active_equipment(&self) -> StoreResult<Vec<Equipment>> {
        self.enter("list_active_equipment").await?;
        Ok(self
            .lock()
            .equipment
            .values()
            .rev()
            .filter(|e| e.is_active)
            .cloned()
            .collect())
    }

    async fn list_equipment_ids(&self) -> StoreResult<Vec<DbId>> {
        self.enter("list_equipment_ids").await?;
        Ok(self.lock().equipment.keys().copied().collect())
    }

    async fn update_equipment(
        &self,
        id: DbId,
        input: &UpdateEquipment,
    ) -> StoreResult<Option<Equipment>> {
        self.enter("update_equipment").await?;
        let mut state = self.lock();
        let now = state.now();
        let Some(equipment) = state.equipment.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            equipment.name = name.clone();
        }
        if let Some(description) = &input.description {
            equipment.description = description.clone();
        }
        if let Some(location) = &input.location {
            equipment.location = location.clone();
        }
        if let Some(category) = &input.category {
            equipment.category = category.clone();
        }
        if let Some(hours) = input.crit_walk_interval_hours {
            equipment.crit_walk_interval_hours = hours;
        }
        if let Some(count) = input.expected_photo_count {
            equipment.expected_photo_count = count;
        }
        if let Some(guidelines) = &input.photo_guidelines {
            equipment.photo_guidelines = Some(guidelines.clone());
        }
        if let Some(tags) = &input.tags {
            equipment.tags = tags.clone();
        }
        equipment.updated_at = now;
        Ok(Some(equipment.clone()))
    }

    async fn deactivate_equipment(&self, id: DbId) -> StoreResult<bool> {
        self.enter("deactivate_equipment").await?;
        let mut state = self.lock();
        let now = state.now();
        match state.equipment.get_mut(&id) {
            Some(equipment) if equipment.is_active => {
                equipment.is_active = false;
                equipment.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_status(&self, equipment_id: DbId) -> StoreResult<Option<EquipmentStatusRow>> {
        self.enter("find_status").await?;
        Ok(self.lock().statuses.get(&equipment_id).cloned())
    }

    async fn list_active_statuses(&self) -> StoreResult<Vec<EquipmentStatusRow>> {
        self.enter("list_active_statuses").await?;
        let state = self.lock();
        Ok(state
            .equipment
            .values()
            .rev()
            .filter(|e| e.is_active)
            .filter_map(|e| state.statuses.get(&e.id).cloned())
            .collect())
    }

    async fn reconcile_failures(
        &self,
        equipment_id: DbId,
    ) -> StoreResult<Option<EquipmentStatusRow>> {
        self.enter("reconcile_failures").await?;
        Ok(self.lock().update_status(equipment_id, |aggregate, walks| {
            let summary = FailureSummary::from_samples(walks.iter().map(|w| w.failure_sample()));
            aggregate.apply_reconciliation(&summary);
        }))
    }

    async fn record_crit_walk(&self, input: &CreateCritWalk) -> StoreResult<CritWalkWithStatus> {
        self.enter("record_crit_walk").await?;
        let mut state = self.lock();
        if !state.equipment.contains_key(&input.equipment_id) {
            return Err(StoreError::Rejected(format!(
                "equipment {} does not exist",
                input.equipment_id
            )));
        }
        let now = state.now();
        let id = state.next_id();
        let walk = CritWalk {
            id,
            equipment_id: input.equipment_id,
            equipment_name: input.equipment_name.clone(),
            technician_name: input.technician_name.clone(),
            completed_at: now,
            notes: input.notes.clone(),
            has_failure: input.has_failure,
            work_order_number: input.work_order_number.clone(),
            failure_resolved_at: None,
            failure_resolved_by: None,
            created_at: now,
            updated_at: now,
        };
        state.walks.insert(id, walk.clone());

        let recorded = WalkRecorded {
            completed_at: walk.completed_at,
            technician_name: walk.technician_name.clone(),
            has_failure: walk.has_failure,
        };
        let status = state.update_status(input.equipment_id, |aggregate, _| {
            aggregate.record_walk(&recorded)
        });
        Ok(CritWalkWithStatus {
            crit_walk: walk,
            status,
        })
    }

    async fn find_crit_walk(
        &self,
        equipment_id: DbId,
        id: DbId,
    ) -> StoreResult<Option<CritWalk>> {
        self.enter("find_crit_walk").await?;
        Ok(self
            .lock()
            .walks
            .get(&id)
            .filter(|w| w.equipment_id == equipment_id)
            .cloned())
    }

    async fn list_crit_walks(&self, equipment_id: DbId, limit: i64) -> StoreResult<Vec<CritWalk>> {
        self.enter("list_crit_walks").await?;
        let state = self.lock();
        let mut walks: Vec<CritWalk> = state
            .walks
            .values()
            .filter(|w| w.equipment_id == equipment_id)
            .cloned()
            .collect();
        walks.sort_by(|a, b| (b.completed_at, b.id).cmp(&(a.completed_at, a.id)));
        walks.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(walks)
    }

    async fn list_crit_walks_before(
        &self,
        equipment_id: DbId,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CritWalk>> {
        self.enter("list_crit_walks_before").await?;
        let state = self.lock();
        let mut walks: Vec<CritWalk> = state
            .walks
            .values()
            .filter(|w| w.equipment_id == equipment_id && w.completed_at < cutoff)
            .cloned()
            .collect();
        walks.sort_by_key(|w| (w.completed_at, w.id));
        Ok(walks)
    }

    async fn update_failure_fields(
        &self,
        id: DbId,
        fields: &FailureFields,
    ) -> StoreResult<Option<CritWalk>> {
        self.enter("update_failure_fields").await?;
        if !fields.has_failure
            && (fields.failure_resolved_at.is_some() || fields.failure_resolved_by.is_some())
        {
            return Err(StoreError::Rejected(
                "resolution recorded without a failure".into(),
            ));
        }
        let mut state = self.lock();
        let now = state.now();
        Ok(state.walks.get_mut(&id).map(|walk| {
            walk.apply_failure_fields(fields.clone(), now);
            walk.clone()
        }))
    }

    async fn resolve_crit_walk(
        &self,
        equipment_id: DbId,
        id: DbId,
        resolved_by: &str,
        resolved_at: Timestamp,
    ) -> StoreResult<Option<CritWalkWithStatus>> {
        self.enter("resolve_crit_walk").await?;
        let mut state = self.lock();
        let now = state.now();
        let Some(walk) = state
            .walks
            .get_mut(&id)
            .filter(|w| w.failure_state().is_active())
        else {
            return Ok(None);
        };
        walk.failure_resolved_at = Some(resolved_at);
        walk.failure_resolved_by = Some(resolved_by.to_string());
        walk.updated_at = now;
        let crit_walk = walk.clone();

        let status = state.update_status(equipment_id, |aggregate, _| {
            aggregate.release_active_failure()
        });
        Ok(Some(CritWalkWithStatus { crit_walk, status }))
    }

    async fn delete_crit_walk(&self, id: DbId) -> StoreResult<bool> {
        self.enter("delete_crit_walk").await?;
        let mut state = self.lock();
        if state.walks.remove(&id).is_none() {
            return Ok(false);
        }
        state.photos.retain(|_, p| p.crit_walk_id != id);
        state.comments.retain(|_, c| c.crit_walk_id != id);
        for assignment in state.assignments.values_mut() {
            if assignment.crit_walk_id == Some(id) {
                assignment.crit_walk_id = None;
            }
        }
        Ok(true)
    }

    async fn append_photos(
        &self,
        crit_walk_id: DbId,
        photos: &[CreateCritWalkPhoto],
    ) -> StoreResult<Vec<CritWalkPhoto>> {
        self.enter("append_photos").await?;
        let mut state = self.lock();
        if photos.is_empty() {
            return Ok(Vec::new());
        }
        state.walk_exists(crit_walk_id)?;
        let taken = state.photos.values().any(|existing| {
            existing.crit_walk_id == crit_walk_id
                && photos.iter().any(|p| p.position == existing.position)
        });
        if taken {
            return Err(StoreError::Rejected(format!(
                "duplicate photo position on crit walk {crit_walk_id}"
            )));
        }

        let now = state.now();
        let mut inserted = Vec::with_capacity(photos.len());
        for photo in photos {
            let id = state.next_id();
            let row = CritWalkPhoto {
                id,
                crit_walk_id,
                storage_url: photo.storage_url.clone(),
                storage_path: photo.storage_path.clone(),
                position: photo.position,
                uploaded_at: now,
            };
            state.photos.insert(id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn list_photos(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkPhoto>> {
        self.enter("list_photos").await?;
        let state = self.lock();
        let mut photos: Vec<CritWalkPhoto> = state
            .photos
            .values()
            .filter(|p| p.crit_walk_id == crit_walk_id)
            .cloned()
            .collect();
        photos.sort_by_key(|p| p.position);
        Ok(photos)
    }

    async fn append_comment(
        &self,
        crit_walk_id: DbId,
        input: &CreateCritWalkComment,
    ) -> StoreResult<CritWalkComment> {
        self.enter("append_comment").await?;
        let mut state = self.lock();
        state.walk_exists(crit_walk_id)?;
        let now = state.now();
        let id = state.next_id();
        let comment = CritWalkComment {
            id,
            crit_walk_id,
            text: input.text.clone(),
            created_by: input.created_by.clone(),
            created_at: now,
        };
        state.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, crit_walk_id: DbId) -> StoreResult<Vec<CritWalkComment>> {
        self.enter("list_comments").await?;
        // Ids are allocated in insertion order, so map order is creation order.
        Ok(self
            .lock()
            .comments
            .values()
            .filter(|c| c.crit_walk_id == crit_walk_id)
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, input: &CreateAssignment) -> StoreResult<Assignment> {
        self.enter("create_assignment").await?;
        let mut state = self.lock();
        if !state.equipment.contains_key(&input.equipment_id) {
            return Err(StoreError::Rejected(format!(
                "equipment {} does not exist",
                input.equipment_id
            )));
        }
        let now = state.now();
        let id = state.next_id();
        let assignment = Assignment {
            id,
            equipment_id: input.equipment_id,
            equipment_name: input.equipment_name.clone(),
            technician_name: input.technician_name.clone(),
            assigned_by: input.assigned_by.clone(),
            assigned_at: now,
            due_by: input.due_by,
            status: ASSIGNMENT_PENDING.to_string(),
            completed_at: None,
            crit_walk_id: None,
        };
        state.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment(&self, id: DbId) -> StoreResult<Option<Assignment>> {
        self.enter("find_assignment").await?;
        Ok(self.lock().assignments.get(&id).cloned())
    }

    async fn list_pending_assignments(
        &self,
        technician_name: &str,
    ) -> StoreResult<Vec<Assignment>> {
        self.enter("list_pending_assignments").await?;
        Ok(self
            .lock()
            .assignments
            .values()
            .rev()
            .filter(|a| a.technician_name == technician_name && a.is_open())
            .cloned()
            .collect())
    }

    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>> {
        self.enter("list_assignments").await?;
        Ok(self.lock().assignments.values().rev().cloned().collect())
    }

    async fn complete_assignment(
        &self,
        id: DbId,
        crit_walk_id: DbId,
    ) -> StoreResult<Option<Assignment>> {
        self.enter("complete_assignment").await?;
        let mut state = self.lock();
        let now = state.now();
        Ok(state
            .assignments
            .get_mut(&id)
            .filter(|a| a.is_open())
            .map(|assignment| {
                assignment.status = ASSIGNMENT_COMPLETED.to_string();
                assignment.completed_at = Some(now);
                assignment.crit_walk_id = Some(crit_walk_id);
                assignment.clone()
            }))
    }

    async fn mark_overdue_assignments(&self, now: Timestamp) -> StoreResult<Vec<Assignment>> {
        self.enter("mark_overdue_assignments").await?;
        let mut state = self.lock();
        Ok(state
            .assignments
            .values_mut()
            .filter(|a| a.is_pending() && a.is_past_due(now))
            .map(|assignment| {
                assignment.status = ASSIGNMENT_OVERDUE.to_string();
                assignment.clone()
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Retryable;

    fn equipment(name: &str) -> CreateEquipment {
        CreateEquipment {
            name: name.to_string(),
            description: None,
            location: None,
            category: None,
            crit_walk_interval_hours: None,
            expected_photo_count: None,
            photo_guidelines: None,
            tags: None,
        }
    }

    fn walk(equipment_id: DbId, has_failure: bool) -> CreateCritWalk {
        CreateCritWalk {
            equipment_id,
            equipment_name: "Press 2".into(),
            technician_name: "Dana".into(),
            notes: None,
            has_failure,
            work_order_number: has_failure.then(|| "WO-7".to_string()),
        }
    }

    #[tokio::test]
    async fn equipment_gets_zeroed_status() {
        let store = MemoryInspectionStore::new();
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        let status = store.find_status(eq.id).await.unwrap().unwrap();
        assert_eq!(status.total_walks_completed, 0);
        assert_eq!(eq.crit_walk_interval_hours, DEFAULT_CRIT_WALK_INTERVAL_HOURS);
    }

    #[tokio::test]
    async fn completed_at_comes_from_store_clock() {
        let store = MemoryInspectionStore::new();
        let pinned = Utc::now() - chrono::Duration::days(3);
        store.set_now(pinned);
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        let created = store.record_crit_walk(&walk(eq.id, false)).await.unwrap();
        assert_eq!(created.crit_walk.completed_at, pinned);
        assert_eq!(
            created.status.unwrap().last_crit_walk_at,
            Some(pinned)
        );

        store.advance(chrono::Duration::hours(2));
        assert_eq!(store.now(), pinned + chrono::Duration::hours(2));
    }

    #[tokio::test]
    async fn resolve_applies_once_with_its_release() {
        let store = MemoryInspectionStore::new();
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        let flagged = store.record_crit_walk(&walk(eq.id, true)).await.unwrap().crit_walk;
        let clean = store.record_crit_walk(&walk(eq.id, false)).await.unwrap().crit_walk;
        let now = store.now();

        let resolved = store
            .resolve_crit_walk(eq.id, flagged.id, "Morgan", now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status.unwrap().active_failure_count, 0);
        assert!(store
            .resolve_crit_walk(eq.id, flagged.id, "Riley", now)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .resolve_crit_walk(eq.id, clean.id, "Morgan", now)
            .await
            .unwrap()
            .is_none());

        let stored = store.find_crit_walk(eq.id, flagged.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_resolved_by.as_deref(), Some("Morgan"));
        let status = store.find_status(eq.id).await.unwrap().unwrap();
        assert_eq!(status.active_failure_count, 0);
        assert_eq!(status.total_walks_completed, 2);
    }

    #[tokio::test]
    async fn failed_record_writes_nothing() {
        let store = MemoryInspectionStore::new();
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        store.fail_next("record_crit_walk", 1);
        assert!(store.record_crit_walk(&walk(eq.id, true)).await.is_err());

        assert!(store.list_crit_walks(eq.id, 10).await.unwrap().is_empty());
        let status = store.find_status(eq.id).await.unwrap().unwrap();
        assert_eq!(status.total_walks_completed, 0);
        assert_eq!(status.active_failure_count, 0);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryInspectionStore::new();
        store.fail_next("list_equipment_ids", 1);
        let err = store.list_equipment_ids().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.list_equipment_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_photos_and_comments() {
        let store = MemoryInspectionStore::new();
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        let created = store.record_crit_walk(&walk(eq.id, false)).await.unwrap().crit_walk;
        store
            .append_photos(
                created.id,
                &[CreateCritWalkPhoto {
                    storage_url: "https://cdn/p.jpg".into(),
                    storage_path: "p.jpg".into(),
                    position: 0,
                }],
            )
            .await
            .unwrap();
        store
            .append_comment(
                created.id,
                &CreateCritWalkComment {
                    text: "ok".into(),
                    created_by: "Morgan".into(),
                },
            )
            .await
            .unwrap();

        assert!(store.delete_crit_walk(created.id).await.unwrap());
        assert!(store.list_photos(created.id).await.unwrap().is_empty());
        assert!(store.list_comments(created.id).await.unwrap().is_empty());
        assert!(!store.delete_crit_walk(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_photo_position_is_rejected() {
        let store = MemoryInspectionStore::new();
        let eq = store.create_equipment("Morgan", &equipment("Press 2")).await.unwrap();
        let created = store.record_crit_walk(&walk(eq.id, false)).await.unwrap().crit_walk;
        let photo = CreateCritWalkPhoto {
            storage_url: "https://cdn/p.jpg".into(),
            storage_path: "p.jpg".into(),
            position: 0,
        };
        store.append_photos(created.id, &[photo.clone()]).await.unwrap();
        let err = store.append_photos(created.id, &[photo]).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
