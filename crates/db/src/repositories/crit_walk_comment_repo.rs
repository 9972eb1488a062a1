//! Repository for the `crit_walk_comments` table.

use critwalk_core::types::DbId;
use sqlx::PgPool;

use crate::models::crit_walk::{CreateCritWalkComment, CritWalkComment};

/// Column list for crit_walk_comments queries.
const COLUMNS: &str = "id, crit_walk_id, text, created_by, created_at";

/// Append-only access to crit walk comment threads.
pub struct CritWalkCommentRepo;

impl CritWalkCommentRepo {
    /// Append a comment. A single INSERT is the atomic append.
    pub async fn create(
        pool: &PgPool,
        crit_walk_id: DbId,
        input: &CreateCritWalkComment,
    ) -> Result<CritWalkComment, sqlx::Error> {
        let query = format!(
            "INSERT INTO crit_walk_comments (crit_walk_id, text, created_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CritWalkComment>(&query)
            .bind(crit_walk_id)
            .bind(&input.text)
            .bind(&input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Comments on one crit walk, oldest first.
    pub async fn list_by_crit_walk(
        pool: &PgPool,
        crit_walk_id: DbId,
    ) -> Result<Vec<CritWalkComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crit_walk_comments
             WHERE crit_walk_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, CritWalkComment>(&query)
            .bind(crit_walk_id)
            .fetch_all(pool)
            .await
    }
}
