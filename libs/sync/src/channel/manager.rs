//! Push-channel lifecycle management and inbound event routing.
//!
//! The manager owns a single connection scoped to one stream: connect, room
//! join/leave, join re-arm on reconnect, and teardown. Inbound events either
//! update the viewer-count reconciler directly or signal the controller to
//! refetch the authoritative snapshot. Reconnection itself is the
//! transport's job; the manager never loops retries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::channel::events::{self, EventCategory, EventName, ScopedEventPayload, ViewerCountPayload};
use crate::channel::transport::{
    EventHandler, ListenerHandle, PushTransport, TRANSPORT_CONNECT, TRANSPORT_DISCONNECT,
};
use crate::models::snapshot::sanitize_count;
use crate::reconcile::ViewerCountReconciler;

/// Connection lifecycle state. `Joined` requires `Connected` plus an emitted
/// room join; the channel provides no join acknowledgment, so the manager
/// marks itself joined optimistically after the emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Joined,
}

/// Signal that the authoritative snapshot must be refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal;

/// Manages the push-channel connection for one stream.
pub struct EventChannelManager {
    inner: Arc<ManagerInner>,
    listeners: Mutex<Vec<ListenerHandle>>,
    torn_down: AtomicBool,
}

struct ManagerInner {
    stream_id: String,
    transport: Arc<dyn PushTransport>,
    reconciler: Arc<ViewerCountReconciler>,
    refresh_tx: mpsc::UnboundedSender<RefreshSignal>,
    state: Mutex<ChannelState>,
    /// At most one join emission per `Connected` episode; re-armed on every
    /// disconnect and on every fresh connect.
    join_attempted: AtomicBool,
}

impl EventChannelManager {
    pub fn new(
        stream_id: impl Into<String>,
        transport: Arc<dyn PushTransport>,
        reconciler: Arc<ViewerCountReconciler>,
        refresh_tx: mpsc::UnboundedSender<RefreshSignal>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                stream_id: stream_id.into(),
                transport,
                reconciler,
                refresh_tx,
                state: Mutex::new(ChannelState::Disconnected),
                join_attempted: AtomicBool::new(false),
            }),
            listeners: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.inner.state.lock()
    }

    /// Register all event listeners and begin connecting.
    pub async fn connect(&self) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if *state != ChannelState::Disconnected {
                return;
            }
            *state = ChannelState::Connecting;
        }
        self.register_listeners();
        self.inner.transport.connect().await;
    }

    /// Tear down the channel: unsubscribe all listeners first, then a
    /// best-effort room leave if currently joined, then close the transport.
    /// Idempotent; safe when the transport is already closed.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let handles: Vec<ListenerHandle> = self.listeners.lock().drain(..).collect();
        for handle in &handles {
            self.inner.transport.unsubscribe(handle);
        }

        let was_joined = {
            let mut state = self.inner.state.lock();
            let prev = *state;
            *state = ChannelState::Disconnected;
            prev == ChannelState::Joined
        };
        if was_joined {
            self.inner
                .transport
                .emit(events::EMIT_LEAVE, json!({ "stream_id": self.inner.stream_id }));
        }
        self.inner.join_attempted.store(false, Ordering::SeqCst);
        self.inner.transport.disconnect().await;
    }

    fn register_listeners(&self) {
        let mut handles = self.listeners.lock();
        if !handles.is_empty() {
            // Already registered; a re-connect reuses the existing set.
            return;
        }
        let mut names: Vec<&'static str> =
            vec![TRANSPORT_CONNECT, TRANSPORT_DISCONNECT, EventName::VIEWER_COUNT];
        names.extend(events::INVALIDATION_EVENTS);
        for name in names {
            let handle = self.inner.transport.subscribe(name, self.handler_for(name));
            handles.push(handle);
        }
    }

    fn handler_for(&self, event: &'static str) -> EventHandler {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |payload| inner.dispatch(event, payload))
    }
}

impl ManagerInner {
    fn dispatch(&self, event: &str, payload: Value) {
        match event {
            TRANSPORT_CONNECT => self.on_transport_connect(),
            TRANSPORT_DISCONNECT => self.on_transport_disconnect(),
            _ => match events::classify(event) {
                Some(EventCategory::ViewerCount) => self.on_viewer_count(payload),
                Some(EventCategory::Invalidate) => self.on_invalidation(event, payload),
                None => tracing::debug!(event, "unclassified push event — dropped"),
            },
        }
    }

    fn on_transport_connect(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                ChannelState::Connected | ChannelState::Joined => {
                    // Duplicate notification within the same episode.
                    return;
                }
                _ => {
                    *state = ChannelState::Connected;
                    // Fresh connected episode: re-arm before the join attempt.
                    self.join_attempted.store(false, Ordering::SeqCst);
                }
            }
        }
        if !self.join_attempted.swap(true, Ordering::SeqCst) {
            self.transport
                .emit(events::EMIT_JOIN, json!({ "stream_id": self.stream_id }));
            // No join ack exists on this channel; joined is optimistic.
            *self.state.lock() = ChannelState::Joined;
            tracing::debug!(stream_id = %self.stream_id, "stream room join emitted");
        }
    }

    fn on_transport_disconnect(&self) {
        *self.state.lock() = ChannelState::Disconnected;
        self.join_attempted.store(false, Ordering::SeqCst);
        tracing::debug!(stream_id = %self.stream_id, "push channel disconnected");
    }

    fn on_viewer_count(&self, payload: Value) {
        let parsed: ViewerCountPayload = match serde_json::from_value(payload) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(%err, "dropping malformed viewer:count payload");
                return;
            }
        };
        if parsed.stream_id != self.stream_id {
            tracing::debug!(
                got = %parsed.stream_id,
                "viewer:count for another stream — ignored"
            );
            return;
        }
        self.reconciler.apply_push(sanitize_count(&parsed.count));
    }

    fn on_invalidation(&self, event: &str, payload: Value) {
        let scope: ScopedEventPayload = match serde_json::from_value(payload) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%err, event, "dropping malformed push payload");
                return;
            }
        };
        if scope.stream_id != self.stream_id {
            tracing::debug!(got = %scope.stream_id, event, "event for another stream — ignored");
            return;
        }
        tracing::debug!(event, "domain event — scheduling snapshot refresh");
        // A dropped receiver means the session is tearing down; nothing to do.
        let _ = self.refresh_tx.send(RefreshSignal);
    }
}
