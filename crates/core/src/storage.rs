//! Blob path naming for crit walk photos.
//!
//! Photos live under `equipment/{equipment_id}/critwalks/{crit_walk_id}/`.

use crate::types::DbId;

/// Extension used when the uploader does not supply one.
pub const DEFAULT_PHOTO_EXTENSION: &str = "jpg";

/// Object key prefix holding every photo of one crit walk.
pub fn crit_walk_prefix(equipment_id: DbId, crit_walk_id: DbId) -> String {
    format!("equipment/{equipment_id}/critwalks/{crit_walk_id}/")
}

/// Full object key for one photo.
pub fn photo_path(equipment_id: DbId, crit_walk_id: DbId, file_name: &str) -> String {
    format!("{}{file_name}", crit_walk_prefix(equipment_id, crit_walk_id))
}

/// File name for the `index`-th photo of an upload batch started at
/// `uploaded_at_millis`.
pub fn photo_file_name(uploaded_at_millis: i64, index: usize, extension: Option<&str>) -> String {
    let ext = extension
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_PHOTO_EXTENSION)
        .to_ascii_lowercase();
    format!("{uploaded_at_millis}_{index}.{ext}")
}

/// Join a public base URL and an object key with exactly one slash.
pub fn public_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
