//! Equipment registry model.

use critwalk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `equipment` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Equipment {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub created_by: String,
    pub is_active: bool,
    /// Informational only; staleness uses fixed thresholds.
    pub crit_walk_interval_hours: i32,
    pub expected_photo_count: i32,
    pub photo_guidelines: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new equipment item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEquipment {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub crit_walk_interval_hours: Option<i32>,
    pub expected_photo_count: Option<i32>,
    pub photo_guidelines: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// DTO for updating an equipment item. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub crit_walk_interval_hours: Option<i32>,
    pub expected_photo_count: Option<i32>,
    pub photo_guidelines: Option<String>,
    pub tags: Option<Vec<String>>,
}
