//! Photo blob storage seam.
//!
//! A [`BlobStore`] writes bytes under an object key and hands back the public
//! URL the crit walk record stores. Keys follow
//! [`critwalk_core::storage::photo_path`].

mod local;
mod memory;
mod s3;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;

use crate::retry::Retryable;

/// Errors raised by a blob store implementation.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob backend error: {message}")]
    Backend { message: String, retryable: bool },
}

impl Retryable for BlobError {
    fn is_retryable(&self) -> bool {
        match self {
            BlobError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::InvalidInput
                    | std::io::ErrorKind::AlreadyExists
            ),
            BlobError::InvalidPath(_) => false,
            BlobError::Backend { retryable, .. } => *retryable,
        }
    }
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Object storage for crit walk photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path`, replacing any existing object, and return
    /// its public URL.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> BlobResult<String>;

    /// Remove the object at `path`. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> BlobResult<()>;
}

/// Reject keys that are empty, absolute, or escape their prefix.
pub(crate) fn validate_path(path: &str) -> BlobResult<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..");
    if bad {
        return Err(BlobError::InvalidPath(path.to_string()));
    }
    Ok(())
}
