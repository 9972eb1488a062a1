use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use critwalk_core::error::CoreError;
use critwalk_core::retention::{validate_retention_days, RETENTION_DAYS};

use crate::retry::CallPolicy;

/// What to do when the status summary update fails after the crit walk
/// record itself was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryFailurePolicy {
    /// Log at error level and report success; reconciliation heals the drift.
    #[default]
    LogAndContinue,
    /// Return the storage error to the caller. The record is not rolled back.
    Propagate,
}

impl FromStr for SummaryFailurePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "log_and_continue" => Ok(SummaryFailurePolicy::LogAndContinue),
            "propagate" => Ok(SummaryFailurePolicy::Propagate),
            other => Err(CoreError::Validation(format!(
                "SUMMARY_FAILURE_POLICY must be 'log' or 'propagate', got '{other}'"
            ))),
        }
    }
}

/// Where crit walk photos are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobConfig {
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    S3 {
        bucket: String,
        public_base_url: String,
    },
}

/// Tracker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Upper bound on one store or blob call in seconds (default: `10`).
    pub call_timeout_secs: u64,
    /// Attempts for idempotent store and blob calls (default: `3`).
    pub store_max_attempts: u32,
    /// Pause between attempts in milliseconds (default: `250`).
    pub retry_backoff_ms: u64,
    pub summary_failure_policy: SummaryFailurePolicy,
    /// Age in days after which crit walks are swept (default: `30`).
    pub retention_days: i64,
    /// Seconds between retention sweeps (default: `86400`).
    pub retention_interval_secs: u64,
    pub blob: BlobConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            store_max_attempts: 3,
            retry_backoff_ms: 250,
            summary_failure_policy: SummaryFailurePolicy::default(),
            retention_days: RETENTION_DAYS,
            retention_interval_secs: 86_400,
            blob: BlobConfig::Local {
                root: PathBuf::from("./storage"),
                public_base_url: "http://localhost:8080/storage".into(),
            },
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                          |
    /// |---------------------------|----------------------------------|
    /// | `CALL_TIMEOUT_SECS`       | `10`                             |
    /// | `STORE_MAX_ATTEMPTS`      | `3`                              |
    /// | `RETRY_BACKOFF_MS`        | `250`                            |
    /// | `SUMMARY_FAILURE_POLICY`  | `log` (or `propagate`)           |
    /// | `RETENTION_DAYS`          | `30`                             |
    /// | `RETENTION_INTERVAL_SECS` | `86400`                          |
    /// | `BLOB_BACKEND`            | `local` (or `s3`)                |
    /// | `BLOB_LOCAL_DIR`          | `./storage`                      |
    /// | `BLOB_PUBLIC_BASE_URL`    | `http://localhost:8080/storage`  |
    /// | `S3_BUCKET`               | required when backend is `s3`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TrackerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let call_timeout_secs = parse_or(&lookup, "CALL_TIMEOUT_SECS", defaults.call_timeout_secs)?;
        if call_timeout_secs == 0 {
            return Err(CoreError::Validation(
                "CALL_TIMEOUT_SECS must be greater than 0".into(),
            ));
        }

        let store_max_attempts =
            parse_or(&lookup, "STORE_MAX_ATTEMPTS", defaults.store_max_attempts)?;
        if store_max_attempts == 0 {
            return Err(CoreError::Validation(
                "STORE_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }

        let retry_backoff_ms = parse_or(&lookup, "RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?;

        let summary_failure_policy = parse_or(
            &lookup,
            "SUMMARY_FAILURE_POLICY",
            defaults.summary_failure_policy,
        )?;

        let retention_days = parse_or(&lookup, "RETENTION_DAYS", defaults.retention_days)?;
        validate_retention_days(retention_days)?;

        let retention_interval_secs = parse_or(
            &lookup,
            "RETENTION_INTERVAL_SECS",
            defaults.retention_interval_secs,
        )?;
        if retention_interval_secs == 0 {
            return Err(CoreError::Validation(
                "RETENTION_INTERVAL_SECS must be greater than 0".into(),
            ));
        }

        let public_base_url = lookup("BLOB_PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080/storage".into());
        let backend = lookup("BLOB_BACKEND").unwrap_or_else(|| "local".into());
        let blob = match backend.trim().to_ascii_lowercase().as_str() {
            "local" => BlobConfig::Local {
                root: lookup("BLOB_LOCAL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./storage")),
                public_base_url,
            },
            "s3" => BlobConfig::S3 {
                bucket: lookup("S3_BUCKET").filter(|b| !b.trim().is_empty()).ok_or_else(
                    || CoreError::Validation("S3_BUCKET is required when BLOB_BACKEND=s3".into()),
                )?,
                public_base_url,
            },
            other => {
                return Err(CoreError::Validation(format!(
                    "BLOB_BACKEND must be 'local' or 's3', got '{other}'"
                )))
            }
        };

        Ok(Self {
            call_timeout_secs,
            store_max_attempts,
            retry_backoff_ms,
            summary_failure_policy,
            retention_days,
            retention_interval_secs,
            blob,
        })
    }

    /// Timeout and retry settings for collaborator calls.
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.call_timeout_secs),
            max_attempts: self.store_max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Period of the retention job, never shorter than one second.
    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs.max(1))
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Validation(format!("{key} is invalid: {e}"))),
    }
}
