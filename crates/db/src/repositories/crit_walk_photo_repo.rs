//! Repository for the `crit_walk_photos` table.

use critwalk_core::types::DbId;
use sqlx::PgPool;

use crate::models::crit_walk::{CreateCritWalkPhoto, CritWalkPhoto};

/// Column list for crit_walk_photos queries.
const COLUMNS: &str = "id, crit_walk_id, storage_url, storage_path, position, uploaded_at";

/// Append-only access to crit walk photos.
pub struct CritWalkPhotoRepo;

impl CritWalkPhotoRepo {
    /// Attach uploaded photos. Each photo is its own row, so concurrent
    /// appends never touch the same element.
    pub async fn append(
        pool: &PgPool,
        crit_walk_id: DbId,
        photos: &[CreateCritWalkPhoto],
    ) -> Result<Vec<CritWalkPhoto>, sqlx::Error> {
        if photos.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO crit_walk_photos (crit_walk_id, storage_url, storage_path, position)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let mut inserted = Vec::with_capacity(photos.len());
        for photo in photos {
            let row = sqlx::query_as::<_, CritWalkPhoto>(&query)
                .bind(crit_walk_id)
                .bind(&photo.storage_url)
                .bind(&photo.storage_path)
                .bind(photo.position)
                .fetch_one(&mut *tx)
                .await?;
            inserted.push(row);
        }
        tx.commit().await?;

        Ok(inserted)
    }

    /// Photos of one crit walk ordered by position.
    pub async fn list_by_crit_walk(
        pool: &PgPool,
        crit_walk_id: DbId,
    ) -> Result<Vec<CritWalkPhoto>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crit_walk_photos WHERE crit_walk_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, CritWalkPhoto>(&query)
            .bind(crit_walk_id)
            .fetch_all(pool)
            .await
    }
}
