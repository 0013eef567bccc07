use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use livedeck_sync::channel::transport::{
    EventHandler, ListenerHandle, PushTransport, TRANSPORT_CONNECT,
};
use livedeck_sync::config::SyncConfig;
use livedeck_sync::controller::SessionController;
use livedeck_sync::error::FetchError;
use livedeck_sync::fetch::{MutationCommands, SnapshotFetcher, ViewerStatsFetcher};
use livedeck_sync::models::comment::Comment;
use livedeck_sync::models::snapshot::{LivestreamInfo, StreamSnapshot, ViewerStatsSnapshot};
use livedeck_sync::session::StreamStatus;

/// In-memory authoritative backend shared by the fetcher and mutation traits.
#[derive(Default)]
pub struct FakeBackend {
    snapshot: Mutex<StreamSnapshot>,
    viewer_stats: Mutex<ViewerStatsSnapshot>,
    pub snapshot_calls: AtomicU64,
    pub viewer_calls: AtomicU64,
    not_found: AtomicBool,
    fail_snapshots: AtomicBool,
    fail_mutations: AtomicBool,
    pub mutations: Mutex<Vec<String>>,
}

impl FakeBackend {
    /// Backend hosting one live stream with no comments yet.
    pub fn live(stream_id: &str) -> Self {
        let backend = Self::default();
        backend.set_snapshot(snapshot(stream_id, StreamStatus::Live, &[]));
        backend
    }

    pub fn set_snapshot(&self, snapshot: StreamSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn set_viewer_stats(&self, stats: ViewerStatsSnapshot) {
        *self.viewer_stats.lock() = stats;
    }

    pub fn set_not_found(&self, value: bool) {
        self.not_found.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_snapshots(&self, value: bool) {
        self.fail_snapshots.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_mutations(&self, value: bool) {
        self.fail_mutations.store(value, Ordering::SeqCst);
    }

    fn record_mutation(&self, description: String) -> Result<(), FetchError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("mutation rejected".into()));
        }
        self.mutations.lock().push(description);
        Ok(())
    }
}

#[async_trait]
impl SnapshotFetcher for FakeBackend {
    async fn fetch_snapshot(&self, _stream_id: &str) -> Result<StreamSnapshot, FetchError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.not_found.load(Ordering::SeqCst) {
            return Err(FetchError::NotFound);
        }
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("stubbed outage".into()));
        }
        Ok(self.snapshot.lock().clone())
    }
}

#[async_trait]
impl ViewerStatsFetcher for FakeBackend {
    async fn fetch_viewer_stats(
        &self,
        _stream_id: &str,
    ) -> Result<ViewerStatsSnapshot, FetchError> {
        self.viewer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.viewer_stats.lock())
    }
}

#[async_trait]
impl MutationCommands for FakeBackend {
    async fn pin_comment(&self, _stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        self.record_mutation(format!("pin:{comment_id}"))
    }

    async fn unpin_comment(&self, _stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        self.record_mutation(format!("unpin:{comment_id}"))
    }

    async fn delete_comment(&self, _stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        self.record_mutation(format!("delete:{comment_id}"))
    }

    async fn submit_comment(&self, _stream_id: &str, text: &str) -> Result<(), FetchError> {
        self.record_mutation(format!("submit:{text}"))
    }
}

/// In-memory push transport. Tests deliver inbound events with [`fire`].
///
/// [`fire`]: FakeTransport::fire
#[derive(Default)]
pub struct FakeTransport {
    listeners: Mutex<HashMap<String, Vec<(u64, EventHandler)>>>,
    next_id: AtomicU64,
    pub emitted: Mutex<Vec<(String, Value)>>,
    pub connected: AtomicBool,
}

impl FakeTransport {
    pub fn fire(&self, event: &str, payload: Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .get(event)
            .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(payload.clone());
        }
    }

    pub fn emits_of(&self, event: &str) -> usize {
        self.emitted
            .lock()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.fire(TRANSPORT_CONNECT, serde_json::json!({}));
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn emit(&self, event: &str, payload: Value) {
        self.emitted.lock().push((event.to_string(), payload));
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        ListenerHandle::new(event, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle) {
        if let Some(handlers) = self.listeners.lock().get_mut(handle.event()) {
            handlers.retain(|(id, _)| *id != handle.id());
        }
    }
}

/// Build a full snapshot for `stream_id` in the given status.
pub fn snapshot(stream_id: &str, status: StreamStatus, comments: &[Comment]) -> StreamSnapshot {
    StreamSnapshot {
        livestream: Some(LivestreamInfo {
            id: stream_id.to_string(),
            title: "Launch day".to_string(),
            status,
            start_time: None,
            end_time: None,
        }),
        comments: comments.to_vec(),
        ..StreamSnapshot::default()
    }
}

pub fn comment(id: &str, pinned: bool, created_secs: i64) -> Comment {
    use chrono::TimeZone;
    Comment {
        id: id.to_string(),
        text: format!("comment {id}"),
        author_ref: "usr_1".to_string(),
        is_pinned: pinned,
        created_at: Some(chrono::Utc.timestamp_opt(created_secs, 0).unwrap()),
        ..Comment::default()
    }
}

/// Controller wired to the fakes with a fast poll interval.
pub fn controller_for(
    stream_id: &str,
    moderator: bool,
    backend: &Arc<FakeBackend>,
    transport: &Arc<FakeTransport>,
) -> SessionController {
    let config = SyncConfig {
        poll_interval: std::time::Duration::from_millis(100),
        moderator,
    };
    SessionController::new(
        stream_id,
        config,
        Arc::clone(backend) as Arc<dyn SnapshotFetcher>,
        Arc::clone(backend) as Arc<dyn ViewerStatsFetcher>,
        Arc::clone(backend) as Arc<dyn MutationCommands>,
        Arc::clone(transport) as Arc<dyn PushTransport>,
    )
}

/// Give spawned tasks and paused-clock timers a chance to run.
pub async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
        tokio::time::advance(std::time::Duration::from_millis(10)).await;
    }
}
