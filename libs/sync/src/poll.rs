//! De-duplicated periodic refresh of authoritative viewer statistics.
//!
//! At most one fetch is in flight at any instant regardless of timer
//! cadence: ticks that land while a fetch is running are skipped outright,
//! never queued, so a stale result can never be applied after a newer one.
//! Completion order therefore equals issue order and no sequence numbering
//! is needed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::fetch::ViewerStatsFetcher;
use crate::reconcile::ViewerCountReconciler;

/// Boolean in-flight latch. Release is drop-based so no failure path can
/// leave the holder wedged in "always skip".
pub(crate) struct InFlightGuard {
    held: AtomicBool,
}

impl InFlightGuard {
    pub(crate) fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the latch if free. The token releases it on drop.
    pub(crate) fn try_acquire(&self) -> Option<InFlightToken<'_>> {
        if self.held.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlightToken { guard: self })
        }
    }

    pub(crate) fn clear(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

pub(crate) struct InFlightToken<'a> {
    guard: &'a InFlightGuard,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.guard.clear();
    }
}

/// Runs the periodic authoritative viewer-stats refresh for one session.
pub struct PollingSyncScheduler {
    stream_id: String,
    fetcher: Arc<dyn ViewerStatsFetcher>,
    reconciler: Arc<ViewerCountReconciler>,
    in_flight: Arc<InFlightGuard>,
    handle: Mutex<Option<JoinHandle<()>>>,
    skipped_ticks: Arc<AtomicU64>,
}

impl PollingSyncScheduler {
    pub fn new(
        stream_id: impl Into<String>,
        fetcher: Arc<dyn ViewerStatsFetcher>,
        reconciler: Arc<ViewerCountReconciler>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            fetcher,
            reconciler,
            in_flight: Arc::new(InFlightGuard::new()),
            handle: Mutex::new(None),
            skipped_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of ticks skipped because a fetch was already in flight.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Fetch immediately, then on every interval tick until [`stop`].
    /// Calling `start` again replaces the previous schedule.
    ///
    /// [`stop`]: PollingSyncScheduler::stop
    pub fn start(&self, interval: Duration) {
        self.stop_timer();

        let stream_id = self.stream_id.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let reconciler = Arc::clone(&self.reconciler);
        let in_flight = Arc::clone(&self.in_flight);
        let skipped = Arc::clone(&self.skipped_ticks);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // Ticks that would fire mid-fetch are dropped, not queued.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await; // first tick fires immediately
                let Some(_token) = in_flight.try_acquire() else {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%stream_id, "viewer sync already in flight — tick skipped");
                    continue;
                };
                run_sync(&stream_id, fetcher.as_ref(), &reconciler).await;
            }
        });
        *self.handle.lock() = Some(task);
    }

    /// On-demand guarded sync sharing the schedule's in-flight latch. A
    /// concurrent fetch turns this into a no-op.
    pub async fn refresh_now(&self) {
        let Some(_token) = self.in_flight.try_acquire() else {
            return;
        };
        run_sync(&self.stream_id, self.fetcher.as_ref(), &self.reconciler).await;
    }

    /// Cancel the schedule and clear the in-flight latch. Safe to call
    /// repeatedly; the timer handle is cleared before returning.
    pub fn stop(&self) {
        self.stop_timer();
        self.in_flight.clear();
    }

    fn stop_timer(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
    }
}

/// One authoritative fetch + apply. Failures are logged and absorbed — the
/// schedule keeps running.
async fn run_sync(
    stream_id: &str,
    fetcher: &dyn ViewerStatsFetcher,
    reconciler: &ViewerCountReconciler,
) {
    match fetcher.fetch_viewer_stats(stream_id).await {
        Ok(snapshot) => {
            reconciler.apply_sync(snapshot);
        }
        Err(err) => {
            tracing::warn!(%stream_id, %err, "viewer stats sync failed");
        }
    }
}
