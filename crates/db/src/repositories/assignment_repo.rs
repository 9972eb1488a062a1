//! Repository for the `assignments` table.

use critwalk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::assignment::{Assignment, CreateAssignment};

/// Column list for assignments queries.
const COLUMNS: &str = "id, equipment_id, equipment_name, technician_name, assigned_by, \
    assigned_at, due_by, status, completed_at, crit_walk_id";

/// Provides CRUD operations for crit walk assignments.
pub struct AssignmentRepo;

impl AssignmentRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateAssignment,
    ) -> Result<Assignment, sqlx::Error> {
        let query = format!(
            "INSERT INTO assignments
                (equipment_id, equipment_name, technician_name, assigned_by, due_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(input.equipment_id)
            .bind(&input.equipment_name)
            .bind(&input.technician_name)
            .bind(&input.assigned_by)
            .bind(input.due_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Assignment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assignments WHERE id = $1");
        sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Open (pending or overdue) assignments for one technician, newest first.
    pub async fn list_pending_by_technician(
        pool: &PgPool,
        technician_name: &str,
    ) -> Result<Vec<Assignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignments
             WHERE technician_name = $1 AND status IN ('pending', 'overdue')
             ORDER BY assigned_at DESC"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(technician_name)
            .fetch_all(pool)
            .await
    }

    /// Every assignment, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Assignment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assignments ORDER BY assigned_at DESC");
        sqlx::query_as::<_, Assignment>(&query).fetch_all(pool).await
    }

    /// Mark an open assignment completed by the given crit walk.
    ///
    /// Returns `None` if the assignment does not exist or is already completed.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        crit_walk_id: DbId,
    ) -> Result<Option<Assignment>, sqlx::Error> {
        let query = format!(
            "UPDATE assignments SET
                status = 'completed',
                completed_at = NOW(),
                crit_walk_id = $2
             WHERE id = $1 AND status IN ('pending', 'overdue')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .bind(crit_walk_id)
            .fetch_optional(pool)
            .await
    }

    /// Flip pending assignments whose due date is before `now` to overdue.
    pub async fn mark_overdue(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Assignment>, sqlx::Error> {
        let query = format!(
            "UPDATE assignments SET status = 'overdue'
             WHERE status = 'pending' AND due_by IS NOT NULL AND due_by < $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }
}
