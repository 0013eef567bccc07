//! Push-channel transport contract.
//!
//! Backed by a WebSocket client in production and an in-memory fake in
//! tests. Reconnection policy (attempt count, backoff) belongs to the
//! transport; the manager only reacts to `connect`/`disconnect`
//! notifications, delivered through the same subscription mechanism as
//! domain events.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// Reserved transport-lifecycle event names.
pub const TRANSPORT_CONNECT: &str = "connect";
pub const TRANSPORT_DISCONNECT: &str = "disconnect";

/// Callback invoked with the raw payload of a subscribed event.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Opaque handle identifying one subscription. Teardown requires the handle
/// rather than re-deriving the event-name list, so the subscribe and
/// unsubscribe sets cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    event: String,
    id: u64,
}

impl ListenerHandle {
    pub fn new(event: impl Into<String>, id: u64) -> Self {
        Self {
            event: event.into(),
            id,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Bidirectional event channel scoped to one stream.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Begin connecting. Success is reported through the `connect` event;
    /// failures are swallowed by the transport's own retry policy.
    async fn connect(&self);

    /// Close the connection and stop reconnecting. Must not error if the
    /// transport is already closed.
    async fn disconnect(&self);

    /// Fire-and-forget emit toward the server. Dropped if disconnected.
    fn emit(&self, event: &str, payload: Value);

    /// Register a handler for an inbound event. The returned handle is the
    /// only way to unsubscribe.
    fn subscribe(&self, event: &str, handler: EventHandler) -> ListenerHandle;

    /// Remove a previously registered handler. Unknown handles are ignored.
    fn unsubscribe(&self, handle: &ListenerHandle);
}
