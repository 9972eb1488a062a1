#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use critwalk_core::roles::Session;
use critwalk_core::types::{DbId, Timestamp};
use critwalk_db::models::equipment::CreateEquipment;
use critwalk_tracker::blob::MemoryBlobStore;
use critwalk_tracker::config::{BlobConfig, SummaryFailurePolicy, TrackerConfig};
use critwalk_tracker::store::MemoryInspectionStore;
use critwalk_tracker::tracker::{CreateCritWalkRequest, CritWalkTracker, PhotoUpload};

pub type TestTracker = CritWalkTracker<MemoryInspectionStore, MemoryBlobStore>;

/// Test harness: the tracker plus handles sharing its stores' state.
pub struct Harness {
    pub tracker: TestTracker,
    pub store: MemoryInspectionStore,
    pub blobs: MemoryBlobStore,
}

/// A `TrackerConfig` with a zero backoff so retries do not slow tests down.
pub fn test_config() -> TrackerConfig {
    TrackerConfig {
        call_timeout_secs: 5,
        store_max_attempts: 3,
        retry_backoff_ms: 0,
        summary_failure_policy: SummaryFailurePolicy::LogAndContinue,
        retention_days: 30,
        retention_interval_secs: 3600,
        blob: BlobConfig::Local {
            root: "./unused".into(),
            public_base_url: "memory://blobs".into(),
        },
    }
}

pub fn build_harness(config: TrackerConfig) -> Harness {
    let store = MemoryInspectionStore::new();
    let blobs = MemoryBlobStore::new();
    let tracker = CritWalkTracker::new(store.clone(), blobs.clone(), config);
    Harness {
        tracker,
        store,
        blobs,
    }
}

pub fn manager() -> Session {
    Session::manager("Morgan")
}

pub fn technician() -> Session {
    Session::technician("Dana")
}

/// Fixed reference instant used to pin the store clock.
pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 14, 6, 0, 0).unwrap()
}

pub fn new_equipment(name: &str) -> CreateEquipment {
    CreateEquipment {
        name: name.to_string(),
        description: Some("Line-side hydraulic press".to_string()),
        location: Some("Bay 3".to_string()),
        category: Some("Press".to_string()),
        crit_walk_interval_hours: None,
        expected_photo_count: Some(2),
        photo_guidelines: None,
        tags: Some(vec!["hydraulics".to_string()]),
    }
}

pub async fn create_equipment(harness: &Harness, name: &str) -> DbId {
    harness
        .tracker
        .create_equipment(&manager(), new_equipment(name))
        .await
        .unwrap()
        .id
}

pub fn photo(name: &str) -> PhotoUpload {
    PhotoUpload {
        file_name: name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: format!("bytes of {name}").into_bytes(),
    }
}

pub fn clean_walk(equipment_id: DbId) -> CreateCritWalkRequest {
    CreateCritWalkRequest {
        equipment_id,
        notes: Some("All guards in place".to_string()),
        ..CreateCritWalkRequest::default()
    }
}

pub fn failed_walk(equipment_id: DbId, work_order: &str) -> CreateCritWalkRequest {
    CreateCritWalkRequest {
        equipment_id,
        notes: Some("Hydraulic leak at ram seal".to_string()),
        has_failure: true,
        work_order_number: Some(work_order.to_string()),
        ..CreateCritWalkRequest::default()
    }
}

/// Record a walk as the default technician and return its id.
pub async fn record(harness: &Harness, request: CreateCritWalkRequest) -> DbId {
    harness
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap()
        .crit_walk
        .id
}
