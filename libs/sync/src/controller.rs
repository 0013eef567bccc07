//! UI-facing session controller.
//!
//! Single owner of the `Session`, viewer stats, and comment/product/reaction
//! collections for the currently viewed stream. The channel manager, polling
//! scheduler, and ordering engine all read from and write to this one copy;
//! none of them keeps a shadow of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::channel::manager::{ChannelState, EventChannelManager, RefreshSignal};
use crate::channel::transport::PushTransport;
use crate::config::SyncConfig;
use crate::effects::{SessionEffect, SessionEffects};
use crate::error::{FetchError, SyncError};
use crate::fetch::{MutationCommands, SnapshotFetcher, ViewerStatsFetcher};
use crate::models::comment::Comment;
use crate::models::product::Product;
use crate::models::reaction::Reaction;
use crate::models::snapshot::StreamSnapshot;
use crate::ordering;
use crate::poll::{InFlightGuard, PollingSyncScheduler};
use crate::reconcile::ViewerCountReconciler;
use crate::session::{Session, StreamStatus, ViewerStats};

/// Controller for one open livestream view. Cheap to clone; all clones share
/// the same session state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SyncConfig,
    session: Mutex<Session>,
    /// Comments, kept in display order (see [`crate::ordering`]).
    comments: Mutex<Vec<Comment>>,
    products: Mutex<Vec<Product>>,
    reactions: Mutex<Vec<Reaction>>,
    reconciler: Arc<ViewerCountReconciler>,
    scheduler: PollingSyncScheduler,
    channel: EventChannelManager,
    snapshots: Arc<dyn SnapshotFetcher>,
    commands: Arc<dyn MutationCommands>,
    effects: SessionEffects,
    /// De-duplicates concurrent snapshot refetches (push invalidations,
    /// mutation follow-ups, explicit refreshes).
    refresh_guard: InFlightGuard,
    refresh_rx: Mutex<Option<mpsc::UnboundedReceiver<RefreshSignal>>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl SessionController {
    pub fn new(
        stream_id: impl Into<String>,
        config: SyncConfig,
        snapshots: Arc<dyn SnapshotFetcher>,
        viewers: Arc<dyn ViewerStatsFetcher>,
        commands: Arc<dyn MutationCommands>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let stream_id = stream_id.into();
        let effects = SessionEffects::new();
        let reconciler = Arc::new(ViewerCountReconciler::new(effects.clone()));
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

        let channel = EventChannelManager::new(
            stream_id.clone(),
            transport,
            Arc::clone(&reconciler),
            refresh_tx,
        );
        let scheduler =
            PollingSyncScheduler::new(stream_id.clone(), viewers, Arc::clone(&reconciler));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                session: Mutex::new(Session::new(stream_id)),
                comments: Mutex::new(Vec::new()),
                products: Mutex::new(Vec::new()),
                reactions: Mutex::new(Vec::new()),
                reconciler,
                scheduler,
                channel,
                snapshots,
                commands,
                effects,
                refresh_guard: InFlightGuard::new(),
                refresh_rx: Mutex::new(Some(refresh_rx)),
                refresh_task: Mutex::new(None),
                started: AtomicBool::new(false),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load the initial authoritative snapshot and, if the stream is live,
    /// bring up the push channel and the polling schedule.
    ///
    /// One-shot: a failure here is terminal for this controller instance.
    /// Session-not-found means the stream should be abandoned, not retried.
    pub async fn start(&self) -> Result<(), SyncError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stream_id = self.stream_id();
        let snapshot = match self.inner.snapshots.fetch_snapshot(&stream_id).await {
            Ok(snapshot) => snapshot,
            Err(FetchError::NotFound) => {
                return Err(SyncError::SessionNotFound(stream_id));
            }
            Err(err) => return Err(err.into()),
        };
        self.inner.apply_snapshot(snapshot);

        if self.inner.session.lock().status == StreamStatus::Live {
            self.spawn_refresh_consumer();
            self.inner.channel.connect().await;
            self.inner.scheduler.start(self.inner.config.poll_interval);
        }
        Ok(())
    }

    /// Tear down the session. The polling timer, the push channel, and the
    /// refresh consumer are all cancelled before this returns. Idempotent.
    pub async fn teardown(&self) {
        self.inner.shutdown_realtime().await;
    }

    /// Refetch the authoritative snapshot on demand.
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    fn spawn_refresh_consumer(&self) {
        let Some(mut rx) = self.inner.refresh_rx.lock().take() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Coalesce a burst of invalidations into one refetch.
                while rx.try_recv().is_ok() {}
                inner.refresh().await;
            }
        });
        *self.inner.refresh_task.lock() = Some(task);
    }

    // -----------------------------------------------------------------------
    // Mutation commands
    // -----------------------------------------------------------------------

    /// Pin a comment. Moderator-only; the backend applies the change and the
    /// session reconciles via a full refetch rather than a local patch.
    pub async fn pin_comment(&self, comment_id: &str) -> Result<(), SyncError> {
        self.require_moderator("pin comment")?;
        let stream_id = self.stream_id();
        self.inner
            .commands
            .pin_comment(&stream_id, comment_id)
            .await
            .map_err(SyncError::Mutation)?;
        self.inner.refresh().await;
        Ok(())
    }

    /// Unpin a comment. Moderator-only.
    pub async fn unpin_comment(&self, comment_id: &str) -> Result<(), SyncError> {
        self.require_moderator("unpin comment")?;
        let stream_id = self.stream_id();
        self.inner
            .commands
            .unpin_comment(&stream_id, comment_id)
            .await
            .map_err(SyncError::Mutation)?;
        self.inner.refresh().await;
        Ok(())
    }

    /// Soft-delete a comment. Moderator-only.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), SyncError> {
        self.require_moderator("delete comment")?;
        let stream_id = self.stream_id();
        self.inner
            .commands
            .delete_comment(&stream_id, comment_id)
            .await
            .map_err(SyncError::Mutation)?;
        self.inner.refresh().await;
        Ok(())
    }

    /// Submit a new comment. Open to any actor.
    pub async fn submit_comment(&self, text: &str) -> Result<(), SyncError> {
        let stream_id = self.stream_id();
        self.inner
            .commands
            .submit_comment(&stream_id, text)
            .await
            .map_err(SyncError::Mutation)?;
        self.inner.refresh().await;
        Ok(())
    }

    fn require_moderator(&self, action: &'static str) -> Result<(), SyncError> {
        if self.inner.config.moderator {
            Ok(())
        } else {
            Err(SyncError::PermissionDenied(action))
        }
    }

    fn stream_id(&self) -> String {
        self.inner.session.lock().stream_id.clone()
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn session(&self) -> Session {
        self.inner.session.lock().clone()
    }

    pub fn viewer_stats(&self) -> ViewerStats {
        self.inner.reconciler.stats()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.inner.comments.lock().clone()
    }

    /// The (pinned, unpinned) rendering regions, both in display order.
    pub fn comment_partitions(&self) -> (Vec<Comment>, Vec<Comment>) {
        ordering::partition_pinned(&self.inner.comments.lock())
    }

    pub fn products(&self) -> Vec<Product> {
        self.inner.products.lock().clone()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.inner.reactions.lock().clone()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.inner.channel.state()
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<SessionEffect> {
        self.inner.effects.subscribe()
    }
}

impl ControllerInner {
    /// Refetch the authoritative snapshot and replace local collections.
    ///
    /// Concurrent callers coalesce: if a refresh is already in flight this
    /// call is a no-op — the in-flight fetch delivers the same authoritative
    /// state. A failed fetch means "no change", never "reset to empty".
    async fn refresh(&self) {
        let Some(_token) = self.refresh_guard.try_acquire() else {
            tracing::debug!("snapshot refresh already in flight — skipped");
            return;
        };
        let stream_id = self.session.lock().stream_id.clone();
        match self.snapshots.fetch_snapshot(&stream_id).await {
            Ok(snapshot) => {
                if let Some(status) = self.apply_snapshot(snapshot) {
                    if status != StreamStatus::Live {
                        // The stream left `live`; the realtime overlay comes
                        // down with it.
                        self.shutdown_realtime().await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%stream_id, %err, "snapshot refresh failed");
            }
        }
    }

    /// Replace local collections from a snapshot (always a full replace).
    /// Returns the new status if the session's status advanced.
    fn apply_snapshot(&self, snapshot: StreamSnapshot) -> Option<StreamStatus> {
        *self.comments.lock() = ordering::reorder(&snapshot.comments);
        *self.products.lock() = snapshot.products;
        *self.reactions.lock() = snapshot.reactions;

        let mut status_change = None;
        if let Some(info) = snapshot.livestream {
            let mut session = self.session.lock();
            if session.advance_status(info.status) {
                status_change = Some(session.status);
            }
            if session.start_time.is_none() {
                session.start_time = info.start_time;
            }
            if session.status == StreamStatus::Ended {
                session.end_time = info.end_time;
            }
        }

        self.effects.publish(SessionEffect::SnapshotApplied);
        if let Some(status) = status_change {
            self.effects.publish(SessionEffect::StatusChanged(status));
        }
        status_change
    }

    /// Bring down the realtime overlay: polling, push channel, and the
    /// refresh consumer. Every handle is cleared before returning.
    async fn shutdown_realtime(&self) {
        self.scheduler.stop();
        self.channel.teardown().await;
        if let Some(task) = self.refresh_task.lock().take() {
            task.abort();
        }
    }
}
