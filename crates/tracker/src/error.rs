use critwalk_core::error::CoreError;
use critwalk_core::types::DbId;
use serde::Serialize;

use crate::blob::BlobError;
use crate::retry::Retryable;
use crate::store::StoreError;

/// One photo of a multi-photo submission that did not make it into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoUploadFailure {
    /// Position of the photo in the submitted batch.
    pub index: usize,
    /// Object key the upload targeted.
    pub path: String,
    pub reason: String,
}

/// Error type for tracker operations.
///
/// Wraps [`CoreError`] for domain errors and adds the storage failure modes.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A domain-level error from `critwalk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A document or blob store call failed after all attempts.
    #[error("Storage error during {operation} after {attempts} attempt(s): {message}")]
    StorageIo {
        operation: &'static str,
        message: String,
        retryable: bool,
        attempts: u32,
    },

    /// The crit walk was saved but some of its photos were not.
    #[error(
        "Crit walk {crit_walk_id} saved with {uploaded} photo(s); {} photo(s) failed to upload",
        .failed.len()
    )]
    PartialUpload {
        crit_walk_id: DbId,
        uploaded: usize,
        failed: Vec<PhotoUploadFailure>,
    },
}

impl TrackerError {
    /// Single-attempt storage failure for calls made outside a retry policy.
    fn storage(operation: &'static str, err: &impl Retryable) -> Self {
        TrackerError::StorageIo {
            operation,
            message: err.to_string(),
            retryable: err.is_retryable(),
            attempts: 1,
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        TrackerError::storage("store", &err)
    }
}

impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err).into()
    }
}

impl From<BlobError> for TrackerError {
    fn from(err: BlobError) -> Self {
        TrackerError::storage("blob", &err)
    }
}

/// Convenience type alias for tracker return values.
pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        TrackerError::Core(CoreError::NotFound { entity, id })
    }

    /// Whether retrying the whole operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::StorageIo { retryable: true, .. })
    }
}
