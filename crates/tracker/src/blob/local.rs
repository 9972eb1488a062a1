//! Filesystem-backed [`BlobStore`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use critwalk_core::storage::public_url;
use tokio::fs;

use super::{validate_path, BlobResult, BlobStore};

/// Stores photos as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an object key.
    pub fn file_path(&self, path: &str) -> BlobResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> BlobResult<String> {
        let target = self.file_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a half-written photo.
        let staging = target.with_extension("part");
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &target).await?;

        tracing::debug!(path, size = bytes.len(), "Stored photo");
        Ok(public_url(&self.public_base_url, path))
    }

    async fn delete(&self, path: &str) -> BlobResult<()> {
        let target = self.file_path(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
