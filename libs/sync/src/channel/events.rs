//! Push-channel event names, payloads, and effect classification.

use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Inbound event names
// ---------------------------------------------------------------------------

/// Event names delivered by the push channel.
pub struct EventName;

impl EventName {
    pub const VIEWER_COUNT: &'static str = "viewer:count";
    pub const COMMENT_ADDED: &'static str = "comment:added";
    pub const COMMENT_DELETED: &'static str = "comment:deleted";
    pub const COMMENT_PINNED: &'static str = "comment:pinned";
    pub const COMMENT_UNPINNED: &'static str = "comment:unpinned";
    pub const PRODUCT_ADDED: &'static str = "product:added";
    pub const PRODUCT_REMOVED: &'static str = "product:removed";
    pub const PRODUCT_PINNED: &'static str = "product:pinned";
    pub const PRODUCT_UNPINNED: &'static str = "product:unpinned";
    pub const REACTION_ADDED: &'static str = "reaction:added";
    pub const REACTION_UPDATED: &'static str = "reaction:updated";
}

/// Inbound event names that signal "something changed, go refetch".
pub const INVALIDATION_EVENTS: [&str; 10] = [
    EventName::COMMENT_ADDED,
    EventName::COMMENT_DELETED,
    EventName::COMMENT_PINNED,
    EventName::COMMENT_UNPINNED,
    EventName::PRODUCT_ADDED,
    EventName::PRODUCT_REMOVED,
    EventName::PRODUCT_PINNED,
    EventName::PRODUCT_UNPINNED,
    EventName::REACTION_ADDED,
    EventName::REACTION_UPDATED,
];

// ---------------------------------------------------------------------------
// Outbound (client → server) room control events
// ---------------------------------------------------------------------------

pub const EMIT_JOIN: &str = "stream:join";
pub const EMIT_LEAVE: &str = "stream:leave";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Effect category an inbound event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Direct viewer-count update for the reconciler.
    ViewerCount,
    /// Domain mutation — the authoritative snapshot must be refetched.
    Invalidate,
}

/// Map an inbound event name to its effect category. Unknown names are
/// unclassified and dropped by the manager.
pub fn classify(event: &str) -> Option<EventCategory> {
    if event == EventName::VIEWER_COUNT {
        Some(EventCategory::ViewerCount)
    } else if INVALIDATION_EVENTS.contains(&event) {
        Some(EventCategory::Invalidate)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of a `viewer:count` event. `count` stays raw JSON so malformed
/// values can be reduced to 0 instead of failing deserialization.
#[derive(Debug, Deserialize)]
pub struct ViewerCountPayload {
    #[serde(default, alias = "streamId", alias = "livestreamId")]
    pub stream_id: String,
    #[serde(default)]
    pub count: Value,
}

/// Common envelope of the invalidation events. Only the stream scope is
/// inspected; the rest of the payload is ignored in favor of a refetch.
#[derive(Debug, Deserialize)]
pub struct ScopedEventPayload {
    #[serde(default, alias = "streamId", alias = "livestreamId")]
    pub stream_id: String,
}
