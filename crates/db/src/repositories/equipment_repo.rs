//! Repository for the `equipment` table.

use critwalk_core::equipment::DEFAULT_CRIT_WALK_INTERVAL_HOURS;
use critwalk_core::types::DbId;
use sqlx::PgPool;

use crate::models::equipment::{CreateEquipment, Equipment, UpdateEquipment};
use crate::repositories::equipment_status_repo::EquipmentStatusRepo;

/// Column list for equipment queries.
const COLUMNS: &str = "id, name, description, location, category, created_by, is_active, \
    crit_walk_interval_hours, expected_photo_count, photo_guidelines, tags, \
    created_at, updated_at";

/// Provides CRUD operations for equipment.
pub struct EquipmentRepo;

impl EquipmentRepo {
    /// Register equipment and its zeroed status summary in one transaction.
    pub async fn create(
        pool: &PgPool,
        created_by: &str,
        input: &CreateEquipment,
    ) -> Result<Equipment, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO equipment
                (name, description, location, category, created_by,
                 crit_walk_interval_hours, expected_photo_count, photo_guidelines, tags)
             VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, ''), $5,
                     COALESCE($6, $7), COALESCE($8, 1), $9, COALESCE($10, '{{}}'::TEXT[]))
             RETURNING {COLUMNS}"
        );
        let equipment = sqlx::query_as::<_, Equipment>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.location)
            .bind(&input.category)
            .bind(created_by)
            .bind(input.crit_walk_interval_hours)
            .bind(DEFAULT_CRIT_WALK_INTERVAL_HOURS)
            .bind(input.expected_photo_count)
            .bind(&input.photo_guidelines)
            .bind(&input.tags)
            .fetch_one(&mut *tx)
            .await?;

        EquipmentStatusRepo::insert_zeroed(&mut *tx, equipment.id).await?;

        tx.commit().await?;
        Ok(equipment)
    }

    /// Find equipment by ID, active or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Equipment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM equipment WHERE id = $1");
        sqlx::query_as::<_, Equipment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active equipment, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Equipment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM equipment
             WHERE is_active = TRUE
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Equipment>(&query).fetch_all(pool).await
    }

    /// IDs of every equipment row, including deactivated ones.
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM equipment ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Update equipment by ID, returning the updated row.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEquipment,
    ) -> Result<Option<Equipment>, sqlx::Error> {
        let query = format!(
            "UPDATE equipment SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                category = COALESCE($5, category),
                crit_walk_interval_hours = COALESCE($6, crit_walk_interval_hours),
                expected_photo_count = COALESCE($7, expected_photo_count),
                photo_guidelines = COALESCE($8, photo_guidelines),
                tags = COALESCE($9, tags),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Equipment>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.location)
            .bind(&input.category)
            .bind(input.crit_walk_interval_hours)
            .bind(input.expected_photo_count)
            .bind(&input.photo_guidelines)
            .bind(&input.tags)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete: hide the equipment from the dashboard, keep its history.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment SET is_active = FALSE, updated_at = NOW()
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
