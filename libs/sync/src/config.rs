use std::time::Duration;

/// Tunables for one session controller.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Authoritative viewer-stats polling interval. The production cadence
    /// is 5 s; no backoff or jitter is applied.
    pub poll_interval: Duration,
    /// Whether the local actor may pin/unpin/delete comments.
    pub moderator: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            moderator: false,
        }
    }
}
