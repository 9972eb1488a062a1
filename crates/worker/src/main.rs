use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use critwalk_tracker::blob::{BlobStore, LocalBlobStore, S3BlobStore};
use critwalk_tracker::config::{BlobConfig, TrackerConfig};
use critwalk_tracker::retention;
use critwalk_tracker::store::{InspectionStore, PgInspectionStore};
use critwalk_tracker::tracker::CritWalkTracker;
use critwalk_worker::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = TrackerConfig::from_env().context("Invalid tracker configuration")?;
    tracing::info!(
        retention_days = config.retention_days,
        call_timeout_secs = config.call_timeout_secs,
        summary_failure_policy = ?config.summary_failure_policy,
        "Loaded tracker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = critwalk_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    critwalk_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    critwalk_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let store = PgInspectionStore::new(pool.clone());

    // --- Blob storage ---
    match config.blob.clone() {
        BlobConfig::Local {
            root,
            public_base_url,
        } => {
            tracing::info!(root = %root.display(), "Using local photo storage");
            run_with(store, LocalBlobStore::new(root, public_base_url), config).await;
        }
        BlobConfig::S3 {
            bucket,
            public_base_url,
        } => {
            tracing::info!(%bucket, "Using S3 photo storage");
            let blobs = S3BlobStore::from_env(bucket, public_base_url).await;
            run_with(store, blobs, config).await;
        }
    }

    pool.close().await;
    tracing::info!("Worker shut down");
    Ok(())
}

/// Run background jobs until a shutdown signal arrives.
async fn run_with<S, B>(store: S, blobs: B, config: TrackerConfig)
where
    S: InspectionStore + 'static,
    B: BlobStore + 'static,
{
    let tracker = Arc::new(CritWalkTracker::new(store, blobs, config));

    let cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(retention::run(Arc::clone(&tracker), cancel.clone()));

    shutdown_signal().await;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Retention job stopped");
}
