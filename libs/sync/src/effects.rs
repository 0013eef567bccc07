//! Broadcast hub for observable session-state changes.
//!
//! Uses a single `tokio::sync::broadcast` channel. The embedding UI
//! subscribes and re-reads the shared session state on each effect. No-op
//! updates are suppressed at the source and never reach this hub.

use tokio::sync::broadcast;

use crate::session::{StreamStatus, ViewerStats};

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip effects (RecvError::Lagged) and should re-read the shared state.
const EFFECTS_CAPACITY: usize = 256;

/// An observable state change published to UI subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Viewer statistics changed, via either the push or the sync path.
    ViewerStatsChanged(ViewerStats),
    /// The comment/product/reaction collections were replaced by an
    /// authoritative refetch.
    SnapshotApplied,
    /// The stream's lifecycle status advanced.
    StatusChanged(StreamStatus),
}

/// The session-scoped effects hub. Cloneable — share via the controller.
#[derive(Clone)]
pub struct SessionEffects {
    sender: broadcast::Sender<SessionEffect>,
}

impl SessionEffects {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EFFECTS_CAPACITY);
        Self { sender }
    }

    /// Subscribe to session effects. Each UI consumer should call this once
    /// to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEffect> {
        self.sender.subscribe()
    }

    /// Publish an effect to all subscribers.
    pub fn publish(&self, effect: SessionEffect) {
        // send() returns Err if there are no receivers — that's fine.
        let _ = self.sender.send(effect);
    }
}

impl Default for SessionEffects {
    fn default() -> Self {
        Self::new()
    }
}
