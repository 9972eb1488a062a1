//! Integration tests for `CritWalkTracker` over the in-memory stores.
//!
//! Covers the status lifecycle end to end:
//! - Zeroed summaries and live staleness classification
//! - Create / resolve deltas and reconciliation after edits
//! - Per-photo upload isolation and partial upload reporting
//! - Summary failure policy, timeouts and retries
//! - Comments, dashboard, equipment and assignment operations

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Duration as ChronoDuration;
use common::*;
use critwalk_core::error::CoreError;
use critwalk_core::failure_tracking::FailureState;
use critwalk_core::roles::Session;
use critwalk_core::status::StatusColor;
use critwalk_db::models::equipment::UpdateEquipment;
use critwalk_tracker::config::SummaryFailurePolicy;
use critwalk_tracker::error::TrackerError;
use critwalk_tracker::store::InspectionStore;
use critwalk_tracker::tracker::CreateCritWalkRequest;

// ---------------------------------------------------------------------------
// Status summary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_equipment_has_zeroed_summary() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;

    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.total_walks_completed, 0);
    assert_eq!(status.active_failure_count, 0);
    assert!(!status.has_active_failure);
    assert_eq!(status.status, StatusColor::Never);
    assert!(status.hours_since_last_walk.is_none());
}

#[tokio::test]
async fn status_of_unknown_equipment_is_not_found() {
    let h = build_harness(test_config());
    let result = h.tracker.equipment_status(404).await;
    assert_matches!(
        result,
        Err(TrackerError::Core(CoreError::NotFound { entity: "equipment", id: 404 }))
    );
}

#[tokio::test]
async fn walk_then_failure_then_resolve_scenario() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let t = t0();

    h.store.set_now(t);
    record(&h, clean_walk(equipment_id)).await;

    let status = h.tracker.equipment_status_at(equipment_id, t).await.unwrap();
    assert_eq!(status.total_walks_completed, 1);
    assert_eq!(status.last_crit_walk_at, Some(t));
    assert_eq!(status.last_crit_walk_by.as_deref(), Some("Dana"));
    assert_eq!(status.active_failure_count, 0);
    assert_eq!(status.status, StatusColor::Green);

    let later = h
        .tracker
        .equipment_status_at(equipment_id, t + ChronoDuration::hours(9))
        .await
        .unwrap();
    assert_eq!(later.status, StatusColor::Yellow);

    h.store.advance(ChronoDuration::hours(10));
    let failed = record(&h, failed_walk(equipment_id, "WO-1")).await;
    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.active_failure_count, 1);
    assert!(status.has_active_failure);
    assert_eq!(status.total_walks_completed, 2);
    assert_eq!(status.last_failure_at, Some(t + ChronoDuration::hours(10)));

    let update = h
        .tracker
        .resolve_failure(&manager(), equipment_id, failed)
        .await
        .unwrap();
    assert_eq!(update.crit_walk.failure_resolved_by.as_deref(), Some("Morgan"));
    let status = update.status.expect("summary updated");
    assert_eq!(status.active_failure_count, 0);
    assert!(!status.has_active_failure);
    assert_eq!(status.last_failure_at, Some(t + ChronoDuration::hours(10)));
}

#[tokio::test]
async fn failed_walk_increments_active_count_by_one() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    record(&h, failed_walk(equipment_id, "WO-1")).await;

    let outcome = h
        .tracker
        .create_crit_walk(&technician(), failed_walk(equipment_id, "WO-2"))
        .await
        .unwrap();
    let status = outcome.status.expect("summary updated");
    assert_eq!(status.active_failure_count, 2);
    assert!(status.has_active_failure);
}

// ---------------------------------------------------------------------------
// Failure lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolving_twice_is_a_conflict_and_count_stays_zero() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;

    h.tracker
        .resolve_failure(&manager(), equipment_id, walk_id)
        .await
        .unwrap();
    let second = h
        .tracker
        .resolve_failure(&Session::manager("Riley"), equipment_id, walk_id)
        .await;
    assert_matches!(second, Err(TrackerError::Core(CoreError::Conflict(_))));

    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.active_failure_count, 0);
    let detail = h.tracker.crit_walk(equipment_id, walk_id).await.unwrap();
    assert_eq!(detail.walk.failure_resolved_by.as_deref(), Some("Morgan"));
}

#[tokio::test]
async fn release_is_floored_at_zero_after_drift() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;
    h.store.force_active_failure_count(equipment_id, 0);

    let update = h
        .tracker
        .resolve_failure(&manager(), equipment_id, walk_id)
        .await
        .unwrap();
    assert_eq!(update.status.unwrap().active_failure_count, 0);
}

#[tokio::test]
async fn resolving_a_walk_without_failure_is_validation() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, clean_walk(equipment_id)).await;

    let result = h.tracker.resolve_failure(&manager(), equipment_id, walk_id).await;
    assert_matches!(result, Err(TrackerError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn resolving_unknown_or_foreign_walk_is_not_found() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let other_id = create_equipment(&h, "Press 3").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;

    assert_matches!(
        h.tracker.resolve_failure(&manager(), equipment_id, 9999).await,
        Err(TrackerError::Core(CoreError::NotFound { entity: "crit_walk", .. }))
    );
    assert_matches!(
        h.tracker.resolve_failure(&manager(), other_id, walk_id).await,
        Err(TrackerError::Core(CoreError::NotFound { entity: "crit_walk", .. }))
    );
}

#[tokio::test]
async fn technicians_cannot_resolve_or_edit() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;

    assert_matches!(
        h.tracker.resolve_failure(&technician(), equipment_id, walk_id).await,
        Err(TrackerError::Core(CoreError::Forbidden(_)))
    );
    assert_matches!(
        h.tracker
            .edit_failure_details(&technician(), equipment_id, walk_id, false, None)
            .await,
        Err(TrackerError::Core(CoreError::Forbidden(_)))
    );

    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.active_failure_count, 1);
}

#[tokio::test]
async fn edit_reconciles_drifted_counter() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    record(&h, failed_walk(equipment_id, "WO-1")).await;
    let second = record(&h, failed_walk(equipment_id, "WO-2")).await;
    record(&h, clean_walk(equipment_id)).await;

    h.store.force_active_failure_count(equipment_id, 7);

    let update = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, second, false, None)
        .await
        .unwrap();
    assert_eq!(update.crit_walk.failure_state(), FailureState::NoFailure);
    let status = update.status.expect("summary reconciled");
    assert_eq!(status.active_failure_count, 1);
    assert!(status.has_active_failure);
}

#[tokio::test]
async fn any_edit_sequence_matches_full_recount() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let mut ids = Vec::new();
    for i in 0..5 {
        let request = if i % 2 == 0 {
            failed_walk(equipment_id, &format!("WO-{i}"))
        } else {
            clean_walk(equipment_id)
        };
        ids.push(record(&h, request).await);
    }

    h.tracker
        .resolve_failure(&manager(), equipment_id, ids[0])
        .await
        .unwrap();
    h.store.force_active_failure_count(equipment_id, 0);

    let edits = [
        (ids[1], true, Some("WO-11")),
        (ids[2], false, None),
        (ids[0], true, Some("WO-0b")),
        (ids[3], true, Some("WO-13")),
        (ids[3], false, None),
    ];
    for (id, has_failure, work_order) in edits {
        h.tracker
            .edit_failure_details(
                &manager(),
                equipment_id,
                id,
                has_failure,
                work_order.map(str::to_string),
            )
            .await
            .unwrap();
    }

    let history = h.tracker.history(equipment_id, None).await.unwrap();
    let expected = history
        .iter()
        .filter(|w| w.failure_state().is_active())
        .count() as i32;
    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.active_failure_count, expected);
    assert_eq!(expected, 3);
}

#[tokio::test]
async fn clearing_a_failure_clears_its_resolution() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;
    h.tracker
        .resolve_failure(&manager(), equipment_id, walk_id)
        .await
        .unwrap();

    let update = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, walk_id, false, None)
        .await
        .unwrap();
    assert!(update.crit_walk.failure_resolved_at.is_none());
    assert!(update.crit_walk.failure_resolved_by.is_none());
    assert!(update.crit_walk.work_order_number.is_none());
}

#[tokio::test]
async fn reflagging_a_resolved_walk_reopens_it() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;
    h.tracker
        .resolve_failure(&manager(), equipment_id, walk_id)
        .await
        .unwrap();

    let update = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, walk_id, true, Some("WO-1b".into()))
        .await
        .unwrap();
    assert_eq!(update.crit_walk.failure_state(), FailureState::Flagged);
    assert_eq!(update.crit_walk.work_order_number.as_deref(), Some("WO-1b"));
    assert_eq!(update.status.unwrap().active_failure_count, 1);
}

#[tokio::test]
async fn flagging_without_work_order_is_rejected() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;

    let result = h
        .tracker
        .create_crit_walk(
            &technician(),
            CreateCritWalkRequest {
                equipment_id,
                has_failure: true,
                work_order_number: Some("   ".into()),
                ..CreateCritWalkRequest::default()
            },
        )
        .await;
    assert_matches!(result, Err(TrackerError::Core(CoreError::Validation(_))));
    assert!(h.tracker.history(equipment_id, None).await.unwrap().is_empty());

    let walk_id = record(&h, clean_walk(equipment_id)).await;
    let edit = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, walk_id, true, None)
        .await;
    assert_matches!(edit, Err(TrackerError::Core(CoreError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn round_trip_keeps_fields_and_photos() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;

    let mut request = failed_walk(equipment_id, "WO-9");
    request.photos = vec![photo("front.jpg"), photo("back.PNG"), photo("seal")];
    let outcome = h
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let walk_id = outcome.crit_walk.id;

    let detail = h.tracker.crit_walk(equipment_id, walk_id).await.unwrap();
    assert_eq!(detail.walk.notes.as_deref(), Some("Hydraulic leak at ram seal"));
    assert!(detail.walk.has_failure);
    assert_eq!(detail.walk.work_order_number.as_deref(), Some("WO-9"));
    assert_eq!(detail.walk.technician_name, "Dana");
    assert_eq!(detail.walk.equipment_name, "Press 2");
    assert_eq!(detail.photos.len(), 3);

    let prefix = format!("equipment/{equipment_id}/critwalks/{walk_id}/");
    for (position, stored) in detail.photos.iter().enumerate() {
        assert_eq!(stored.position, position as i32);
        assert!(stored.storage_path.starts_with(&prefix));
        assert!(h.blobs.contains(&stored.storage_path));
    }
    assert!(detail.photos[1].storage_path.ends_with("_1.png"));
    assert!(detail.photos[2].storage_path.ends_with("_2.jpg"));
    assert_eq!(
        h.blobs.get(&detail.photos[0].storage_path).unwrap(),
        b"bytes of front.jpg".to_vec()
    );
}

#[tokio::test]
async fn failed_photo_is_isolated_and_reported() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.blobs.fail_puts_matching("_1.");

    let mut request = clean_walk(equipment_id);
    request.photos = vec![photo("a.jpg"), photo("b.jpg"), photo("c.jpg")];
    let outcome = h
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap();
    let walk_id = outcome.crit_walk.id;
    assert!(!outcome.is_complete());
    assert_eq!(outcome.status.as_ref().unwrap().total_walks_completed, 1);

    let err = outcome.into_result().unwrap_err();
    assert_matches!(
        &err,
        TrackerError::PartialUpload { crit_walk_id, uploaded: 2, failed }
            if *crit_walk_id == walk_id && failed.len() == 1 && failed[0].index == 1
    );

    let detail = h.tracker.crit_walk(equipment_id, walk_id).await.unwrap();
    let positions: Vec<i32> = detail.photos.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![0, 2]);
}

#[tokio::test]
async fn transient_blob_failures_are_retried() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.blobs.fail_next_puts(2);

    let mut request = clean_walk(equipment_id);
    request.photos = vec![photo("a.jpg")];
    let outcome = h
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.photos.len(), 1);
}

#[tokio::test]
async fn too_many_photos_is_rejected_before_writing() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;

    let mut request = clean_walk(equipment_id);
    request.photos = (0..21).map(|i| photo(&format!("{i}.jpg"))).collect();
    let result = h.tracker.create_crit_walk(&technician(), request).await;
    assert_matches!(result, Err(TrackerError::Core(CoreError::Validation(_))));
    assert!(h.blobs.paths().is_empty());
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_failure_is_logged_and_record_kept() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk = record(&h, clean_walk(equipment_id)).await;
    // Exhausts every attempt of the reconcile that follows the edit.
    h.store.fail_next("reconcile_failures", 3);

    let update = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, walk, true, Some("WO-1".into()))
        .await
        .unwrap();
    assert!(update.status.is_none());
    assert!(update.crit_walk.has_failure);

    let drifted = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(drifted.active_failure_count, 0);

    let healed = h.tracker.reconcile(equipment_id).await.unwrap();
    assert_eq!(healed.active_failure_count, 1);
    assert!(healed.has_active_failure);
}

#[tokio::test]
async fn summary_failure_propagates_when_configured() {
    let mut config = test_config();
    config.summary_failure_policy = SummaryFailurePolicy::Propagate;
    let h = build_harness(config);
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk = record(&h, clean_walk(equipment_id)).await;
    h.store.fail_next("reconcile_failures", 3);

    let result = h
        .tracker
        .edit_failure_details(&manager(), equipment_id, walk, true, Some("WO-1".into()))
        .await;
    assert_matches!(
        result,
        Err(TrackerError::StorageIo { operation: "reconcile_failures", retryable: true, attempts: 3, .. })
    );
    let stored = h.tracker.crit_walk(equipment_id, walk).await.unwrap();
    assert!(stored.walk.has_failure);
}

#[tokio::test]
async fn failed_record_writes_neither_walk_nor_summary() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.store.fail_next("record_crit_walk", 1);

    let result = h
        .tracker
        .create_crit_walk(&technician(), failed_walk(equipment_id, "WO-1"))
        .await;
    assert_matches!(
        result,
        Err(TrackerError::StorageIo { operation: "record_crit_walk", attempts: 1, .. })
    );
    assert!(h.tracker.history(equipment_id, None).await.unwrap().is_empty());
    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.total_walks_completed, 0);
    assert_eq!(status.active_failure_count, 0);
}

#[tokio::test]
async fn reads_retry_transient_store_failures() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.store.fail_next("find_status", 2);

    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.total_walks_completed, 0);
}

#[tokio::test]
async fn slow_store_call_times_out_as_retryable() {
    let mut config = test_config();
    config.call_timeout_secs = 1;
    config.store_max_attempts = 1;
    let h = build_harness(config);
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.store.set_latency("find_status", Duration::from_millis(1500));

    let err = h.tracker.equipment_status(equipment_id).await.unwrap_err();
    assert!(err.is_retryable());
    assert_matches!(err, TrackerError::StorageIo { operation: "find_status", .. });
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_do_not_lose_updates() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let tracker = Arc::new(h.tracker);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                let request = if i % 2 == 0 {
                    failed_walk(equipment_id, &format!("WO-{i}"))
                } else {
                    clean_walk(equipment_id)
                };
                tracker
                    .create_crit_walk(&technician(), request)
                    .await
                    .map(|outcome| outcome.crit_walk.id)
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let status = tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.total_walks_completed, 20);
    assert_eq!(status.active_failure_count, 10);
}

async fn active_walks_in_history(tracker: &TestTracker, equipment_id: i64) -> i32 {
    tracker
        .history(equipment_id, Some(100))
        .await
        .unwrap()
        .iter()
        .filter(|w| w.failure_state().is_active())
        .count() as i32
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolve_overlapping_an_edit_keeps_count_exact() {
    // Each slowed operation in turn: the resolve landing after the edit's
    // recount, then the recount landing after the resolve.
    for slowed in ["resolve_crit_walk", "reconcile_failures"] {
        let h = build_harness(test_config());
        let equipment_id = create_equipment(&h, "Press 2").await;
        let a = record(&h, failed_walk(equipment_id, "WO-A")).await;
        let b = record(&h, failed_walk(equipment_id, "WO-B")).await;
        h.store.set_latency(slowed, Duration::from_millis(300));

        let session = manager();
        let (resolved, edited) = tokio::join!(
            h.tracker.resolve_failure(&session, equipment_id, a),
            h.tracker.edit_failure_details(
                &session,
                equipment_id,
                b,
                true,
                Some("WO-B2".into())
            ),
        );
        resolved.unwrap();
        edited.unwrap();

        let status = h.tracker.equipment_status(equipment_id).await.unwrap();
        assert_eq!(status.active_failure_count, 1, "slowed {slowed}");
        assert!(status.has_active_failure);
        assert_eq!(
            status.active_failure_count,
            active_walks_in_history(&h.tracker, equipment_id).await
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_overlapping_an_edit_keeps_count_exact() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let existing = record(&h, clean_walk(equipment_id)).await;
    h.store.set_latency("record_crit_walk", Duration::from_millis(300));

    let session = manager();
    let tech = technician();
    let (created, edited) = tokio::join!(
        h.tracker
            .create_crit_walk(&tech, failed_walk(equipment_id, "WO-N")),
        h.tracker.edit_failure_details(
            &session,
            equipment_id,
            existing,
            true,
            Some("WO-E".into())
        ),
    );
    created.unwrap();
    edited.unwrap();

    let status = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(status.active_failure_count, 2);
    assert_eq!(
        status.active_failure_count,
        active_walks_in_history(&h.tracker, equipment_id).await
    );
}

// ---------------------------------------------------------------------------
// Comments and history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn comments_append_in_order_without_touching_summary() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, failed_walk(equipment_id, "WO-1")).await;
    let before = h.tracker.equipment_status(equipment_id).await.unwrap();

    h.tracker
        .add_comment(&manager(), equipment_id, walk_id, "Parts ordered")
        .await
        .unwrap();
    h.tracker
        .add_comment(&technician(), equipment_id, walk_id, "  Seal replaced  ")
        .await
        .unwrap();

    let detail = h.tracker.crit_walk(equipment_id, walk_id).await.unwrap();
    let texts: Vec<&str> = detail.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Parts ordered", "Seal replaced"]);
    assert_eq!(detail.comments[1].created_by, "Dana");

    let after = h.tracker.equipment_status(equipment_id).await.unwrap();
    assert_eq!(before.active_failure_count, after.active_failure_count);
    assert_eq!(before.total_walks_completed, after.total_walks_completed);
}

#[tokio::test]
async fn invalid_comments_are_rejected() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let walk_id = record(&h, clean_walk(equipment_id)).await;

    assert_matches!(
        h.tracker.add_comment(&manager(), equipment_id, walk_id, "   ").await,
        Err(TrackerError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        h.tracker.add_comment(&manager(), equipment_id, 777, "hello").await,
        Err(TrackerError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    h.store.set_now(t0());
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(record(&h, clean_walk(equipment_id)).await);
        h.store.advance(ChronoDuration::minutes(30));
    }

    let history = h.tracker.history(equipment_id, Some(2)).await.unwrap();
    let got: Vec<_> = history.iter().map(|w| w.id).collect();
    assert_eq!(got, vec![ids[3], ids[2]]);

    let clamped = h.tracker.history(equipment_id, Some(0)).await.unwrap();
    assert_eq!(clamped.len(), 1);
}

// ---------------------------------------------------------------------------
// Equipment, dashboard, assignments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn equipment_management_is_manager_only_and_validated() {
    let h = build_harness(test_config());

    assert_matches!(
        h.tracker
            .create_equipment(&technician(), new_equipment("Press 9"))
            .await,
        Err(TrackerError::Core(CoreError::Forbidden(_)))
    );
    assert_matches!(
        h.tracker.create_equipment(&manager(), new_equipment("  ")).await,
        Err(TrackerError::Core(CoreError::Validation(_)))
    );

    let equipment_id = create_equipment(&h, "  Press 9 ").await;
    let equipment = h.tracker.equipment(equipment_id).await.unwrap();
    assert_eq!(equipment.name, "Press 9");
    assert_eq!(equipment.created_by, "Morgan");
    assert_eq!(equipment.crit_walk_interval_hours, 12);

    let updated = h
        .tracker
        .update_equipment(
            &manager(),
            equipment_id,
            UpdateEquipment {
                location: Some("Bay 4".into()),
                crit_walk_interval_hours: Some(24),
                ..UpdateEquipment::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.location, "Bay 4");
    assert_eq!(updated.crit_walk_interval_hours, 24);

    assert_matches!(
        h.tracker
            .update_equipment(
                &manager(),
                equipment_id,
                UpdateEquipment {
                    crit_walk_interval_hours: Some(0),
                    ..UpdateEquipment::default()
                },
            )
            .await,
        Err(TrackerError::Core(CoreError::Validation(_)))
    );
}

#[tokio::test]
async fn interval_setting_does_not_change_thresholds() {
    let h = build_harness(test_config());
    let equipment_id = h
        .tracker
        .create_equipment(
            &manager(),
            critwalk_db::models::equipment::CreateEquipment {
                crit_walk_interval_hours: Some(2),
                ..new_equipment("Press 5")
            },
        )
        .await
        .unwrap()
        .id;
    h.store.set_now(t0());
    record(&h, clean_walk(equipment_id)).await;

    let status = h
        .tracker
        .equipment_status_at(equipment_id, t0() + ChronoDuration::hours(6))
        .await
        .unwrap();
    assert_eq!(status.status, StatusColor::Green);
}

#[tokio::test]
async fn dashboard_lists_active_equipment_with_live_status() {
    let h = build_harness(test_config());
    let walked = create_equipment(&h, "Press 2").await;
    let idle = create_equipment(&h, "Press 3").await;
    let retired = create_equipment(&h, "Press 4").await;
    h.tracker
        .deactivate_equipment(&manager(), retired)
        .await
        .unwrap();

    h.store.set_now(t0());
    record(&h, clean_walk(walked)).await;

    let entries = h
        .tracker
        .dashboard_at(t0() + ChronoDuration::hours(13))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    let status_of = |id: i64| {
        entries
            .iter()
            .find(|e| e.equipment.id == id)
            .and_then(|e| e.status.as_ref())
            .map(|s| s.status)
    };
    assert_eq!(status_of(walked), Some(StatusColor::Red));
    assert_eq!(status_of(idle), Some(StatusColor::Never));
    assert_eq!(status_of(retired), None);

    assert_matches!(
        h.tracker
            .create_crit_walk(&technician(), clean_walk(retired))
            .await,
        Err(TrackerError::Core(CoreError::NotFound { entity: "equipment", .. }))
    );
}

#[tokio::test]
async fn deactivating_unknown_equipment_is_not_found() {
    let h = build_harness(test_config());
    assert_matches!(
        h.tracker.deactivate_equipment(&manager(), 31).await,
        Err(TrackerError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn assignment_is_completed_by_its_crit_walk() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;

    assert_matches!(
        h.tracker
            .assign_crit_walk(&technician(), equipment_id, "Dana", None)
            .await,
        Err(TrackerError::Core(CoreError::Forbidden(_)))
    );
    let assignment = h
        .tracker
        .assign_crit_walk(&manager(), equipment_id, "Dana", None)
        .await
        .unwrap();
    assert_eq!(h.tracker.pending_assignments(&technician()).await.unwrap().len(), 1);

    let mut request = clean_walk(equipment_id);
    request.assignment_id = Some(assignment.id);
    let outcome = h
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap();
    let completed = outcome.assignment.expect("assignment completed");
    assert_eq!(completed.crit_walk_id, Some(outcome.crit_walk.id));
    assert!(!completed.is_pending());
    assert!(h.tracker.pending_assignments(&technician()).await.unwrap().is_empty());

    let mut again = clean_walk(equipment_id);
    again.assignment_id = Some(assignment.id);
    assert_matches!(
        h.tracker.create_crit_walk(&technician(), again).await,
        Err(TrackerError::Core(CoreError::Conflict(_)))
    );

    let all = h.tracker.assignments(&manager()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(h.store.list_assignments().await.unwrap()[0].id, assignment.id);
}

#[tokio::test]
async fn assignment_for_other_equipment_is_rejected() {
    let h = build_harness(test_config());
    let first = create_equipment(&h, "Press 2").await;
    let second = create_equipment(&h, "Press 3").await;
    let assignment = h
        .tracker
        .assign_crit_walk(&manager(), first, "Dana", None)
        .await
        .unwrap();

    let mut request = clean_walk(second);
    request.assignment_id = Some(assignment.id);
    assert_matches!(
        h.tracker.create_crit_walk(&technician(), request).await,
        Err(TrackerError::Core(CoreError::Validation(_)))
    );
    assert!(h.tracker.history(second, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn past_due_assignment_becomes_overdue_and_can_still_be_walked() {
    let h = build_harness(test_config());
    let equipment_id = create_equipment(&h, "Press 2").await;
    let late = h
        .tracker
        .assign_crit_walk(&manager(), equipment_id, "Dana", Some(t0() - ChronoDuration::hours(2)))
        .await
        .unwrap();
    let on_time = h
        .tracker
        .assign_crit_walk(&manager(), equipment_id, "Dana", Some(t0() + ChronoDuration::hours(2)))
        .await
        .unwrap();

    let overdue = h.tracker.mark_overdue_assignments(t0()).await.unwrap();
    let ids: Vec<_> = overdue.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![late.id]);
    assert!(h.tracker.mark_overdue_assignments(t0()).await.unwrap().is_empty());

    let open = h.tracker.pending_assignments(&technician()).await.unwrap();
    assert_eq!(open.len(), 2);
    let stored_late = open.iter().find(|a| a.id == late.id).unwrap();
    assert_eq!(stored_late.status, "overdue");
    assert!(open.iter().any(|a| a.id == on_time.id && a.is_pending()));

    let mut request = clean_walk(equipment_id);
    request.assignment_id = Some(late.id);
    let outcome = h
        .tracker
        .create_crit_walk(&technician(), request)
        .await
        .unwrap();
    let completed = outcome.assignment.expect("overdue assignment completed");
    assert_eq!(completed.status, "completed");
    assert_eq!(h.tracker.pending_assignments(&technician()).await.unwrap().len(), 1);
}
