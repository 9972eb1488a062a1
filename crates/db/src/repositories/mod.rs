//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod assignment_repo;
pub mod crit_walk_comment_repo;
pub mod crit_walk_photo_repo;
pub mod crit_walk_repo;
pub mod equipment_repo;
pub mod equipment_status_repo;

pub use assignment_repo::AssignmentRepo;
pub use crit_walk_comment_repo::CritWalkCommentRepo;
pub use crit_walk_photo_repo::CritWalkPhotoRepo;
pub use crit_walk_repo::CritWalkRepo;
pub use equipment_repo::EquipmentRepo;
pub use equipment_status_repo::EquipmentStatusRepo;
