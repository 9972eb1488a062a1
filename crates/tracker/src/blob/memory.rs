//! In-memory [`BlobStore`] with failure injection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use critwalk_core::storage::public_url;

use super::{validate_path, BlobError, BlobResult, BlobStore};

const MEMORY_BASE_URL: &str = "memory://blobs";

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct BlobState {
    objects: BTreeMap<String, StoredBlob>,
    /// Keys containing one of these substrings fail permanently on put.
    failing_puts: Vec<String>,
    /// Keys containing one of these substrings fail permanently on delete.
    failing_deletes: Vec<String>,
    /// Retryable failures handed to the next puts, whatever the key.
    transient_put_failures: u32,
}

/// Map-backed blob store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<BlobState>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BlobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.lock().failing_puts.push(pattern.into());
    }

    pub fn fail_deletes_matching(&self, pattern: impl Into<String>) {
        self.lock().failing_deletes.push(pattern.into());
    }

    /// Make the next `times` puts fail with a retryable error.
    pub fn fail_next_puts(&self, times: u32) {
        self.lock().transient_put_failures = times;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().objects.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(path).map(|b| b.bytes.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.lock().objects.get(path).map(|b| b.content_type.clone())
    }

    /// Stored keys in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> BlobResult<String> {
        validate_path(path)?;
        let mut state = self.lock();
        if state.transient_put_failures > 0 {
            state.transient_put_failures -= 1;
            return Err(BlobError::Backend {
                message: format!("injected transient failure for {path}"),
                retryable: true,
            });
        }
        if state.failing_puts.iter().any(|p| path.contains(p.as_str())) {
            return Err(BlobError::Backend {
                message: format!("injected failure for {path}"),
                retryable: false,
            });
        }
        state.objects.insert(
            path.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(MEMORY_BASE_URL, path))
    }

    async fn delete(&self, path: &str) -> BlobResult<()> {
        validate_path(path)?;
        let mut state = self.lock();
        if state.failing_deletes.iter().any(|p| path.contains(p.as_str())) {
            return Err(BlobError::Backend {
                message: format!("injected delete failure for {path}"),
                retryable: false,
            });
        }
        state.objects.remove(path);
        Ok(())
    }
}
