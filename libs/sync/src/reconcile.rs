//! Viewer-count reconciliation between the push channel and the periodic
//! authoritative sync.
//!
//! Push events may only move `current` between syncs; `peak`/`min` are
//! backend-authoritative and change exclusively via [`ViewerCountReconciler::apply_sync`].
//! The UI's peak/min figures may therefore understate reality until the next
//! sync — an accepted staleness bound set by the polling interval.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::effects::{SessionEffect, SessionEffects};
use crate::models::snapshot::ViewerStatsSnapshot;
use crate::session::ViewerStats;

/// Holds the single authoritative view of [`ViewerStats`] for a session and
/// applies updates from two independently-timed sources.
pub struct ViewerCountReconciler {
    stats: Mutex<ViewerStats>,
    /// Bumped once per observable change; no-op updates leave it untouched.
    generation: AtomicU64,
    effects: SessionEffects,
}

impl ViewerCountReconciler {
    pub fn new(effects: SessionEffects) -> Self {
        Self {
            stats: Mutex::new(ViewerStats::default()),
            generation: AtomicU64::new(0),
            effects,
        }
    }

    /// Current stats snapshot.
    pub fn stats(&self) -> ViewerStats {
        *self.stats.lock()
    }

    /// Observable-change counter.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Apply a push-channel viewer count. Touches `current` only; negative
    /// or non-numeric payloads were already reduced to 0 upstream.
    ///
    /// Returns `true` if the stored value changed. An equal count is a
    /// complete no-op — no effect is published.
    pub fn apply_push(&self, count: u64) -> bool {
        let updated = {
            let mut stats = self.stats.lock();
            if stats.current == count {
                return false;
            }
            stats.current = count;
            *stats
        };
        self.mark_changed(updated);
        true
    }

    /// Apply an authoritative sync result, replacing all three fields in one
    /// transition. This is the only path that mutates `peak`/`min`.
    ///
    /// Returns `true` if any field changed.
    pub fn apply_sync(&self, snapshot: ViewerStatsSnapshot) -> bool {
        let next = ViewerStats {
            current: snapshot.current,
            peak: snapshot.peak,
            min: snapshot.min,
        };
        {
            let mut stats = self.stats.lock();
            if *stats == next {
                return false;
            }
            *stats = next;
        }
        self.mark_changed(next);
        true
    }

    fn mark_changed(&self, updated: ViewerStats) {
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.effects.publish(SessionEffect::ViewerStatsChanged(updated));
    }
}
