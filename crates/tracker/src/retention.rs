//! Retention sweep for old crit walks and their photos.
//!
//! Walks every equipment item's crit walk log and deletes walks completed
//! before the cutoff, photos first. One failed deletion is logged and counted
//! and never aborts the sweep.
//!
//! This is not a plain age-based purge. A walk with an unresolved failure is
//! kept regardless of age and reported in `walks_skipped`; it becomes
//! eligible once the failure is resolved or cleared. Deleting it would leave
//! `active_failure_count` counting a walk that no longer exists.

use std::sync::Arc;

use chrono::Utc;
use critwalk_core::types::{DbId, Timestamp};
use critwalk_db::models::crit_walk::CritWalk;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::blob::BlobStore;
use crate::error::TrackerResult;
use crate::retry::CallPolicy;
use crate::store::InspectionStore;
use crate::tracker::CritWalkTracker;

/// Counts from one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub equipment_scanned: usize,
    pub walks_deleted: usize,
    pub photos_deleted: usize,
    /// Expired walks kept because their failure is still active.
    pub walks_skipped: usize,
    /// Individual listings or deletions that failed.
    pub failures: usize,
}

/// Delete every crit walk completed strictly before `cutoff`.
///
/// Only failing to list the equipment ids is returned as an error; every
/// later failure is logged and counted in [`SweepReport::failures`].
pub async fn sweep<S, B>(
    store: &S,
    blobs: &B,
    policy: &CallPolicy,
    cutoff: Timestamp,
) -> TrackerResult<SweepReport>
where
    S: InspectionStore,
    B: BlobStore,
{
    let equipment_ids = policy
        .retrying("list_equipment_ids", || store.list_equipment_ids())
        .await?;

    let mut report = SweepReport::default();
    for equipment_id in equipment_ids {
        report.equipment_scanned += 1;

        let expired = match policy
            .retrying("list_crit_walks_before", || {
                store.list_crit_walks_before(equipment_id, cutoff)
            })
            .await
        {
            Ok(walks) => walks,
            Err(e) => {
                tracing::warn!(equipment_id, error = %e, "Retention: failed to list crit walks");
                report.failures += 1;
                continue;
            }
        };

        for walk in expired {
            if walk.failure_state().is_active() {
                tracing::debug!(
                    equipment_id,
                    crit_walk_id = walk.id,
                    "Retention: keeping expired crit walk with active failure"
                );
                report.walks_skipped += 1;
                continue;
            }
            delete_walk(store, blobs, policy, equipment_id, &walk, &mut report).await;
        }
    }

    if report.walks_deleted > 0 || report.failures > 0 {
        tracing::info!(
            %cutoff,
            equipment_scanned = report.equipment_scanned,
            walks_deleted = report.walks_deleted,
            photos_deleted = report.photos_deleted,
            walks_skipped = report.walks_skipped,
            failures = report.failures,
            "Retention sweep finished"
        );
    } else {
        tracing::debug!(%cutoff, equipment_scanned = report.equipment_scanned, "Retention: nothing to delete");
    }
    Ok(report)
}

async fn delete_walk<S, B>(
    store: &S,
    blobs: &B,
    policy: &CallPolicy,
    equipment_id: DbId,
    walk: &CritWalk,
    report: &mut SweepReport,
) where
    S: InspectionStore,
    B: BlobStore,
{
    let photos = match policy
        .retrying("list_photos", || store.list_photos(walk.id))
        .await
    {
        Ok(photos) => photos,
        Err(e) => {
            tracing::warn!(
                equipment_id,
                crit_walk_id = walk.id,
                error = %e,
                "Retention: failed to list photos, keeping crit walk"
            );
            report.failures += 1;
            return;
        }
    };

    for photo in &photos {
        match policy
            .retrying("delete_photo", || blobs.delete(&photo.storage_path))
            .await
        {
            Ok(()) => report.photos_deleted += 1,
            Err(e) => {
                tracing::warn!(
                    equipment_id,
                    crit_walk_id = walk.id,
                    path = %photo.storage_path,
                    error = %e,
                    "Retention: failed to delete photo"
                );
                report.failures += 1;
            }
        }
    }

    match policy
        .retrying("delete_crit_walk", || store.delete_crit_walk(walk.id))
        .await
    {
        Ok(true) => report.walks_deleted += 1,
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(
                equipment_id,
                crit_walk_id = walk.id,
                error = %e,
                "Retention: failed to delete crit walk"
            );
            report.failures += 1;
        }
    }
}

/// Run the retention sweep and the overdue assignment check on the
/// configured interval until `cancel` fires.
pub async fn run<S, B>(tracker: Arc<CritWalkTracker<S, B>>, cancel: CancellationToken)
where
    S: InspectionStore,
    B: BlobStore,
{
    let interval_duration = tracker.config().retention_interval();
    tracing::info!(
        retention_days = tracker.config().retention_days,
        interval_secs = interval_duration.as_secs(),
        "Crit walk retention job started"
    );

    let mut interval = tokio::time::interval(interval_duration);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Crit walk retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now();
                if let Err(e) = tracker.sweep_expired(now).await {
                    tracing::error!(error = %e, "Crit walk retention: sweep failed");
                }
                if let Err(e) = tracker.mark_overdue_assignments(now).await {
                    tracing::error!(error = %e, "Crit walk retention: overdue check failed");
                }
            }
        }
    }
}
