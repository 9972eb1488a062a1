//! Bounded timeouts and retries for collaborator calls.
//!
//! Every store and blob call goes through a [`CallPolicy`]. A timeout is a
//! retryable storage failure, never a panic or a hang. Only idempotent calls
//! are retried; deltas and inserts get a single attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{TrackerError, TrackerResult};

/// Errors that know whether a repeat attempt could succeed.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

/// Timeout and retry settings applied to every collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Total attempts for idempotent calls (at least 1).
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

impl CallPolicy {
    /// Run a non-idempotent call once, bounded by the timeout.
    pub async fn once<T, E, F, Fut>(&self, operation: &'static str, call: F) -> TrackerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        self.attempt(operation, 1, call).await
    }

    /// Run an idempotent call, retrying retryable failures up to
    /// `max_attempts` times.
    pub async fn retrying<T, E, F, Fut>(
        &self,
        operation: &'static str,
        call: F,
    ) -> TrackerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        self.attempt(operation, self.max_attempts.max(1), call)
            .await
    }

    async fn attempt<T, E, F, Fut>(
        &self,
        operation: &'static str,
        max_attempts: u32,
        mut call: F,
    ) -> TrackerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (message, retryable) = match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => (e.to_string(), e.is_retryable()),
                Err(_) => (
                    format!("timed out after {}ms", self.timeout.as_millis()),
                    true,
                ),
            };

            if !retryable || attempts >= max_attempts {
                return Err(TrackerError::StorageIo {
                    operation,
                    message,
                    retryable,
                    attempts,
                });
            }

            tracing::warn!(operation, attempts, error = %message, "Storage call failed, retrying");
            tokio::time::sleep(self.backoff).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
