mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use livedeck_sync::channel::events::{EventName, EMIT_JOIN, EMIT_LEAVE};
use livedeck_sync::channel::manager::ChannelState;
use livedeck_sync::error::SyncError;
use livedeck_sync::models::snapshot::ViewerStatsSnapshot;
use livedeck_sync::session::StreamStatus;

use common::{comment, controller_for, settle, snapshot, FakeBackend, FakeTransport};

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_loads_snapshot_and_orders_comments() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_snapshot(snapshot(
        "stm_1",
        StreamStatus::Live,
        &[
            comment("late", false, 300),
            comment("pinned", true, 200),
            comment("early", false, 100),
        ],
    ));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");

    let ids: Vec<String> = controller.comments().iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec!["pinned", "early", "late"]);

    let (pinned, unpinned) = controller.comment_partitions();
    assert_eq!(pinned.len(), 1);
    assert_eq!(unpinned.len(), 2);

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn start_on_missing_stream_is_terminal() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_not_found(true);
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_missing", false, &backend, &transport);

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, SyncError::SessionNotFound(id) if id == "stm_missing"));

    // Nothing realtime was brought up for the abandoned session.
    assert!(!transport.connected.load(Ordering::SeqCst));
    assert_eq!(backend.viewer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn live_stream_brings_up_channel_and_polling() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    backend.set_viewer_stats(ViewerStatsSnapshot::new(5, 5, 5));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;

    assert_eq!(controller.channel_state(), ChannelState::Joined);
    assert_eq!(transport.emits_of(EMIT_JOIN), 1);
    assert!(backend.viewer_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(controller.viewer_stats().current, 5);

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn ended_stream_stays_static() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_snapshot(snapshot("stm_1", StreamStatus::Ended, &[]));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;

    assert_eq!(controller.session().status, StreamStatus::Ended);
    assert!(!transport.connected.load(Ordering::SeqCst));
    assert_eq!(backend.viewer_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Push / sync reconciliation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn push_moves_current_and_sync_reconciles_peak() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    backend.set_viewer_stats(ViewerStatsSnapshot::new(5, 5, 5));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    let stats = controller.viewer_stats();
    assert_eq!((stats.current, stats.peak, stats.min), (5, 5, 5));

    // Three push updates with no sync in between.
    for count in [7, 6, 9] {
        transport.fire(
            EventName::VIEWER_COUNT,
            json!({ "stream_id": "stm_1", "count": count }),
        );
    }
    let stats = controller.viewer_stats();
    assert_eq!((stats.current, stats.peak, stats.min), (9, 5, 5));

    // The next authoritative sync catches peak up.
    backend.set_viewer_stats(ViewerStatsSnapshot::new(9, 9, 5));
    settle().await;
    let stats = controller.viewer_stats();
    assert_eq!((stats.current, stats.peak, stats.min), (9, 9, 5));

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn push_for_other_stream_is_ignored() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;

    transport.fire(
        EventName::VIEWER_COUNT,
        json!({ "stream_id": "stm_other", "count": 50 }),
    );
    assert_eq!(controller.viewer_stats().current, 0);

    controller.teardown().await;
}

// ---------------------------------------------------------------------------
// Invalidation refetch
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn domain_event_triggers_snapshot_refetch() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    assert!(controller.comments().is_empty());

    backend.set_snapshot(snapshot(
        "stm_1",
        StreamStatus::Live,
        &[comment("fresh", false, 100)],
    ));
    transport.fire(EventName::COMMENT_ADDED, json!({ "stream_id": "stm_1" }));
    settle().await;

    let comments = controller.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, "fresh");

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_domain_events_coalesces_refetches() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    let baseline = backend.snapshot_calls.load(Ordering::SeqCst);

    // A burst of invalidations lands before the consumer wakes up.
    for _ in 0..5 {
        transport.fire(EventName::COMMENT_ADDED, json!({ "stream_id": "stm_1" }));
    }
    settle().await;

    let refetches = backend.snapshot_calls.load(Ordering::SeqCst) - baseline;
    assert!(refetches >= 1);
    assert!(refetches < 5, "burst was not coalesced: {refetches} refetches");

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_previous_state() {
    let backend = Arc::new(FakeBackend::default());
    backend.set_snapshot(snapshot(
        "stm_1",
        StreamStatus::Live,
        &[comment("keep", false, 100)],
    ));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;

    backend.set_fail_snapshots(true);
    controller.refresh().await;

    // No change, never "reset to empty".
    assert_eq!(controller.comments().len(), 1);

    controller.teardown().await;
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn moderator_commands_are_rejected_locally_without_rights() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");

    assert!(matches!(
        controller.pin_comment("cmt_1").await,
        Err(SyncError::PermissionDenied(_))
    ));
    assert!(matches!(
        controller.unpin_comment("cmt_1").await,
        Err(SyncError::PermissionDenied(_))
    ));
    assert!(matches!(
        controller.delete_comment("cmt_1").await,
        Err(SyncError::PermissionDenied(_))
    ));

    // Rejected before any network call.
    assert!(backend.mutations.lock().is_empty());

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn successful_mutation_triggers_refetch() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", true, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    let baseline = backend.snapshot_calls.load(Ordering::SeqCst);

    controller.pin_comment("cmt_9").await.expect("pin");

    assert_eq!(*backend.mutations.lock(), vec!["pin:cmt_9"]);
    assert_eq!(backend.snapshot_calls.load(Ordering::SeqCst), baseline + 1);

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_mutation_surfaces_and_skips_refetch() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    backend.set_fail_mutations(true);
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", true, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    let baseline = backend.snapshot_calls.load(Ordering::SeqCst);

    assert!(matches!(
        controller.delete_comment("cmt_2").await,
        Err(SyncError::Mutation(_))
    ));
    assert_eq!(backend.snapshot_calls.load(Ordering::SeqCst), baseline);

    controller.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn anyone_may_submit_comments() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    controller.submit_comment("hello").await.expect("submit");

    assert_eq!(*backend.mutations.lock(), vec!["submit:hello"]);

    controller.teardown().await;
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stream_ending_tears_down_the_realtime_overlay() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;
    assert_eq!(controller.channel_state(), ChannelState::Joined);

    backend.set_snapshot(snapshot("stm_1", StreamStatus::Ended, &[]));
    transport.fire(EventName::COMMENT_ADDED, json!({ "stream_id": "stm_1" }));
    settle().await;

    assert_eq!(controller.session().status, StreamStatus::Ended);
    assert_eq!(controller.channel_state(), ChannelState::Disconnected);
    assert_eq!(transport.listener_count(), 0);
    assert!(!transport.connected.load(Ordering::SeqCst));

    // Polling has stopped: no further viewer fetches accumulate.
    let frozen = backend.viewer_calls.load(Ordering::SeqCst);
    settle().await;
    assert_eq!(backend.viewer_calls.load(Ordering::SeqCst), frozen);
}

#[tokio::test(start_paused = true)]
async fn teardown_is_idempotent() {
    let backend = Arc::new(FakeBackend::live("stm_1"));
    let transport = Arc::new(FakeTransport::default());
    let controller = controller_for("stm_1", false, &backend, &transport);

    controller.start().await.expect("start");
    settle().await;

    controller.teardown().await;
    controller.teardown().await;

    assert_eq!(transport.emits_of(EMIT_LEAVE), 1);
    assert_eq!(transport.listener_count(), 0);

    // No timers left behind.
    let frozen = backend.viewer_calls.load(Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(backend.viewer_calls.load(Ordering::SeqCst), frozen);
}
