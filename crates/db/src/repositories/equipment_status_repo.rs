//! Repository for the `equipment_statuses` table.
//!
//! The incremental paths (`record_walk`, `release_active_failure`) are single
//! `UPDATE` statements whose right-hand sides read the pre-update row, so
//! concurrent writers cannot lose each other's increments.
//!
//! Every path that changes the crit walk log and the summary together takes
//! the summary row lock first (`SELECT ... FOR UPDATE`) and does both writes
//! in one transaction: `record_crit_walk`, `resolve_crit_walk` and
//! `reconcile`. A recount therefore never sees a walk write whose delta is
//! still pending.

use critwalk_core::failure_tracking::{FailureSample, FailureSummary, WalkRecorded};
use critwalk_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::crit_walk::CreateCritWalk;
use crate::models::equipment_status::{CritWalkWithStatus, EquipmentStatusRow};
use crate::repositories::CritWalkRepo;

/// Column list for equipment_statuses queries.
const COLUMNS: &str = "id, equipment_id, last_crit_walk_at, last_crit_walk_by, \
    total_walks_completed, has_active_failure, active_failure_count, last_failure_at, \
    updated_at";

/// Column list prefixed with the `s` alias (used in JOIN queries).
const JOINED_COLUMNS: &str = "s.id, s.equipment_id, s.last_crit_walk_at, s.last_crit_walk_by, \
    s.total_walks_completed, s.has_active_failure, s.active_failure_count, s.last_failure_at, \
    s.updated_at";

/// Provides reads and atomic counter updates for equipment status summaries.
pub struct EquipmentStatusRepo;

impl EquipmentStatusRepo {
    /// Insert the zeroed summary for newly registered equipment.
    pub async fn insert_zeroed<'e, E>(
        executor: E,
        equipment_id: DbId,
    ) -> Result<EquipmentStatusRow, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO equipment_statuses (equipment_id) VALUES ($1) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .bind(equipment_id)
            .fetch_one(executor)
            .await
    }

    /// Find the summary for one equipment item.
    pub async fn find_by_equipment(
        pool: &PgPool,
        equipment_id: DbId,
    ) -> Result<Option<EquipmentStatusRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM equipment_statuses WHERE equipment_id = $1");
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .bind(equipment_id)
            .fetch_optional(pool)
            .await
    }

    /// Summaries for every active equipment item.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<EquipmentStatusRow>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM equipment_statuses s
             JOIN equipment e ON e.id = s.equipment_id
             WHERE e.is_active = TRUE
             ORDER BY e.created_at DESC"
        );
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Apply the create-walk delta atomically.
    ///
    /// The last-walk columns only move forward in time. Returns `None` if the
    /// equipment has no summary row.
    pub async fn record_walk<'e, E>(
        executor: E,
        equipment_id: DbId,
        walk: &WalkRecorded,
    ) -> Result<Option<EquipmentStatusRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE equipment_statuses SET
                last_crit_walk_by = CASE
                    WHEN last_crit_walk_at IS NULL OR last_crit_walk_at <= $2 THEN $3
                    ELSE last_crit_walk_by END,
                last_crit_walk_at = GREATEST(last_crit_walk_at, $2),
                total_walks_completed = total_walks_completed + 1,
                active_failure_count = active_failure_count + CASE WHEN $4 THEN 1 ELSE 0 END,
                has_active_failure = (active_failure_count + CASE WHEN $4 THEN 1 ELSE 0 END) > 0,
                last_failure_at = CASE WHEN $4 THEN GREATEST(last_failure_at, $2)
                    ELSE last_failure_at END,
                updated_at = NOW()
             WHERE equipment_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .bind(equipment_id)
            .bind(walk.completed_at)
            .bind(&walk.technician_name)
            .bind(walk.has_failure)
            .fetch_optional(executor)
            .await
    }

    /// Decrement the active failure count by one, floored at zero.
    pub async fn release_active_failure<'e, E>(
        executor: E,
        equipment_id: DbId,
    ) -> Result<Option<EquipmentStatusRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE equipment_statuses SET
                active_failure_count = GREATEST(active_failure_count - 1, 0),
                has_active_failure = GREATEST(active_failure_count - 1, 0) > 0,
                updated_at = NOW()
             WHERE equipment_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .bind(equipment_id)
            .fetch_optional(executor)
            .await
    }

    /// Lock the summary row until the surrounding transaction ends.
    pub async fn lock<'e, E>(
        executor: E,
        equipment_id: DbId,
    ) -> Result<Option<EquipmentStatusRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM equipment_statuses WHERE equipment_id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, EquipmentStatusRow>(&query)
            .bind(equipment_id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a crit walk and apply its create delta in one transaction.
    ///
    /// `status` is `None` when the equipment has no summary row; the walk is
    /// still written.
    pub async fn record_crit_walk(
        pool: &PgPool,
        input: &CreateCritWalk,
    ) -> Result<CritWalkWithStatus, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked = Self::lock(&mut *tx, input.equipment_id).await?;
        let crit_walk = CritWalkRepo::create(&mut *tx, input).await?;
        let status = match locked {
            Some(_) => {
                let walk = WalkRecorded {
                    completed_at: crit_walk.completed_at,
                    technician_name: crit_walk.technician_name.clone(),
                    has_failure: crit_walk.has_failure,
                };
                Self::record_walk(&mut *tx, input.equipment_id, &walk).await?
            }
            None => None,
        };

        tx.commit().await?;
        Ok(CritWalkWithStatus { crit_walk, status })
    }

    /// Resolve a flagged crit walk and release its active failure in one
    /// transaction.
    ///
    /// Returns `None`, with nothing written, unless the walk is currently
    /// flagged.
    pub async fn resolve_crit_walk(
        pool: &PgPool,
        equipment_id: DbId,
        crit_walk_id: DbId,
        resolved_by: &str,
        resolved_at: Timestamp,
    ) -> Result<Option<CritWalkWithStatus>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked = Self::lock(&mut *tx, equipment_id).await?;
        let Some(crit_walk) =
            CritWalkRepo::mark_resolved(&mut *tx, crit_walk_id, resolved_by, resolved_at).await?
        else {
            return Ok(None);
        };
        let status = match locked {
            Some(_) => Self::release_active_failure(&mut *tx, equipment_id).await?,
            None => None,
        };

        tx.commit().await?;
        Ok(Some(CritWalkWithStatus { crit_walk, status }))
    }

    /// Recount the failure columns from the crit walk log.
    ///
    /// Locks the summary row for the duration of the scan so no delta can
    /// interleave with the overwrite. O(n) in the equipment's crit walks.
    pub async fn reconcile(
        pool: &PgPool,
        equipment_id: DbId,
    ) -> Result<Option<EquipmentStatusRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if Self::lock(&mut *tx, equipment_id).await?.is_none() {
            return Ok(None);
        }

        let rows: Vec<(Timestamp, bool, Option<Timestamp>)> = sqlx::query_as(
            "SELECT completed_at, has_failure, failure_resolved_at
             FROM crit_walks WHERE equipment_id = $1",
        )
        .bind(equipment_id)
        .fetch_all(&mut *tx)
        .await?;

        let scanned = rows.len();
        let summary = FailureSummary::from_samples(rows.into_iter().map(
            |(completed_at, has_failure, failure_resolved_at)| FailureSample {
                completed_at,
                has_failure,
                failure_resolved_at,
            },
        ));

        let update_query = format!(
            "UPDATE equipment_statuses SET
                active_failure_count = $2,
                has_active_failure = $3,
                last_failure_at = $4,
                updated_at = NOW()
             WHERE equipment_id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, EquipmentStatusRow>(&update_query)
            .bind(equipment_id)
            .bind(summary.active_failure_count)
            .bind(summary.has_active_failure)
            .bind(summary.last_failure_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            equipment_id,
            scanned,
            active_failure_count = summary.active_failure_count,
            "Reconciled equipment failure summary"
        );
        Ok(Some(row))
    }
}
