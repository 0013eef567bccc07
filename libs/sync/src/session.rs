//! Per-view livestream session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livedeck_common::id::{prefix, prefixed_ulid};

/// Lifecycle status of a livestream.
///
/// Transitions only move forward (`Scheduled → Live → Ended`) within a
/// session; a regression reported by the backend is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    #[default]
    Scheduled,
    Live,
    Ended,
}

/// Last-known viewer statistics for a session.
///
/// `peak`/`min` only ever move on an authoritative sync; push updates may
/// move `current` between syncs (see [`crate::reconcile`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewerStats {
    pub current: u64,
    pub peak: u64,
    pub min: u64,
}

/// State for a single open livestream view.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stream this view is bound to. Immutable for the session's lifetime.
    pub stream_id: String,
    /// Identifier for this view (`ses_` prefixed ULID), used in log fields.
    pub view_id: String,
    pub status: StreamStatus,
    pub start_time: Option<DateTime<Utc>>,
    /// Set only once the stream has ended.
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            view_id: prefixed_ulid(prefix::SESSION),
            status: StreamStatus::Scheduled,
            start_time: None,
            end_time: None,
        }
    }

    /// Advance the lifecycle status. Regressions are ignored — the status is
    /// monotonic within a session.
    ///
    /// Returns `true` if the status changed.
    pub fn advance_status(&mut self, next: StreamStatus) -> bool {
        if next > self.status {
            self.status = next;
            true
        } else {
            if next < self.status {
                tracing::warn!(
                    stream_id = %self.stream_id,
                    current = ?self.status,
                    rejected = ?next,
                    "ignoring stream status regression"
                );
            }
            false
        }
    }

    /// Elapsed live time as of `now`, if the stream has started.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.start_time
            .map(|start| now.signed_duration_since(start).max(chrono::Duration::zero()))
    }
}
