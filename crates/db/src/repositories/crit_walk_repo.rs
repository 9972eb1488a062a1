//! Repository for the `crit_walks` table.

use critwalk_core::failure_tracking::FailureFields;
use critwalk_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::crit_walk::{CreateCritWalk, CritWalk};

/// Column list for crit_walks queries.
const COLUMNS: &str = "id, equipment_id, equipment_name, technician_name, completed_at, \
    notes, has_failure, work_order_number, failure_resolved_at, failure_resolved_by, \
    created_at, updated_at";

/// Provides CRUD operations for crit walks.
pub struct CritWalkRepo;

impl CritWalkRepo {
    /// Insert a crit walk. `completed_at` is assigned by the database clock.
    pub async fn create<'e, E>(executor: E, input: &CreateCritWalk) -> Result<CritWalk, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO crit_walks
                (equipment_id, equipment_name, technician_name, notes, has_failure, work_order_number)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(input.equipment_id)
            .bind(&input.equipment_name)
            .bind(&input.technician_name)
            .bind(&input.notes)
            .bind(input.has_failure)
            .bind(&input.work_order_number)
            .fetch_one(executor)
            .await
    }

    /// Find a crit walk belonging to `equipment_id`.
    pub async fn find_by_id(
        pool: &PgPool,
        equipment_id: DbId,
        id: DbId,
    ) -> Result<Option<CritWalk>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM crit_walks WHERE id = $1 AND equipment_id = $2");
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(id)
            .bind(equipment_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent crit walks for an equipment item, newest first.
    pub async fn list_by_equipment(
        pool: &PgPool,
        equipment_id: DbId,
        limit: i64,
    ) -> Result<Vec<CritWalk>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crit_walks
             WHERE equipment_id = $1
             ORDER BY completed_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(equipment_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Crit walks of one equipment item completed strictly before `cutoff`.
    pub async fn list_completed_before(
        pool: &PgPool,
        equipment_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<CritWalk>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crit_walks
             WHERE equipment_id = $1 AND completed_at < $2
             ORDER BY completed_at ASC"
        );
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(equipment_id)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the failure columns of a crit walk.
    pub async fn update_failure_fields(
        pool: &PgPool,
        id: DbId,
        fields: &FailureFields,
    ) -> Result<Option<CritWalk>, sqlx::Error> {
        let query = format!(
            "UPDATE crit_walks SET
                has_failure = $2,
                work_order_number = $3,
                failure_resolved_at = $4,
                failure_resolved_by = $5,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(id)
            .bind(fields.has_failure)
            .bind(&fields.work_order_number)
            .bind(fields.failure_resolved_at)
            .bind(&fields.failure_resolved_by)
            .fetch_optional(pool)
            .await
    }

    /// Record a resolution, only if the walk is currently flagged.
    ///
    /// Returns `None` when the walk does not exist, has no failure, or was
    /// already resolved. Concurrent resolvers race on this row; at most one
    /// wins.
    pub async fn mark_resolved<'e, E>(
        executor: E,
        id: DbId,
        resolved_by: &str,
        resolved_at: Timestamp,
    ) -> Result<Option<CritWalk>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE crit_walks SET
                failure_resolved_at = $2,
                failure_resolved_by = $3,
                updated_at = NOW()
             WHERE id = $1 AND has_failure AND failure_resolved_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CritWalk>(&query)
            .bind(id)
            .bind(resolved_at)
            .bind(resolved_by)
            .fetch_optional(executor)
            .await
    }

    /// Hard-delete a crit walk. Photos and comments cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM crit_walks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
