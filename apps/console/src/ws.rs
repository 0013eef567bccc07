//! WebSocket push transport.
//!
//! Owns the connection lifecycle including reconnection; the sync core only
//! observes `connect`/`disconnect` events and routes domain events through
//! its subscriptions. Wire format: JSON text frames
//! `{"event": "<name>", "data": {…}}`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

use livedeck_sync::channel::transport::{
    EventHandler, ListenerHandle, PushTransport, TRANSPORT_CONNECT, TRANSPORT_DISCONNECT,
};

/// Delay between reconnection attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// An inbound wire frame.
#[derive(Debug, Deserialize)]
struct WireFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Push transport over a WebSocket connection. Cloneable; all clones share
/// one connection.
#[derive(Clone)]
pub struct WsTransport {
    inner: Arc<WsInner>,
}

struct WsInner {
    url: String,
    /// Subscribers keyed by event name.
    listeners: DashMap<String, Vec<(u64, EventHandler)>>,
    next_listener_id: AtomicU64,
    /// Outbound frames; `None` while disconnected (emits are dropped).
    outbound: Mutex<Option<mpsc::UnboundedSender<tungstenite::Message>>>,
    run_task: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(WsInner {
                url: url.into(),
                listeners: DashMap::new(),
                next_listener_id: AtomicU64::new(0),
                outbound: Mutex::new(None),
                run_task: Mutex::new(None),
                closing: AtomicBool::new(false),
            }),
        }
    }
}

impl WsInner {
    /// Deliver an event to all subscribed handlers.
    fn fire(&self, event: &str, payload: Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .get(event)
            .map(|entry| entry.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(payload.clone());
        }
    }

    /// Connect-read-reconnect loop. Runs until `closing` is set.
    async fn run(self: Arc<Self>) {
        while !self.closing.load(Ordering::SeqCst) {
            match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    let (mut write, mut read) = stream.split();
                    let (tx, mut rx) = mpsc::unbounded_channel::<tungstenite::Message>();
                    *self.outbound.lock() = Some(tx);
                    self.fire(TRANSPORT_CONNECT, json!({}));

                    loop {
                        tokio::select! {
                            frame = read.next() => {
                                match frame {
                                    Some(Ok(tungstenite::Message::Text(text))) => {
                                        match serde_json::from_str::<WireFrame>(&text) {
                                            Ok(frame) => self.fire(&frame.event, frame.data),
                                            Err(err) => {
                                                tracing::warn!(%err, "dropping unparseable frame");
                                            }
                                        }
                                    }
                                    Some(Ok(tungstenite::Message::Ping(_)))
                                    | Some(Ok(tungstenite::Message::Pong(_))) => continue,
                                    Some(Ok(tungstenite::Message::Close(_))) | None => break,
                                    Some(Err(err)) => {
                                        tracing::debug!(%err, "ws read error");
                                        break;
                                    }
                                    _ => continue,
                                }
                            }
                            outgoing = rx.recv() => {
                                match outgoing {
                                    Some(msg) => {
                                        if write.send(msg).await.is_err() {
                                            break;
                                        }
                                    }
                                    None => break,
                                }
                            }
                        }
                    }

                    *self.outbound.lock() = None;
                    self.fire(TRANSPORT_DISCONNECT, json!({}));
                }
                Err(err) => {
                    tracing::warn!(%err, url = %self.url, "push channel connect failed");
                }
            }

            if self.closing.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

#[async_trait]
impl PushTransport for WsTransport {
    async fn connect(&self) {
        let mut task = self.inner.run_task.lock();
        if task.is_some() {
            return;
        }
        self.inner.closing.store(false, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(inner.run()));
    }

    async fn disconnect(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        *self.inner.outbound.lock() = None;
        if let Some(task) = self.inner.run_task.lock().take() {
            task.abort();
        }
    }

    fn emit(&self, event: &str, payload: Value) {
        let frame = json!({ "event": event, "data": payload }).to_string();
        if let Some(tx) = self.inner.outbound.lock().as_ref() {
            let _ = tx.send(tungstenite::Message::Text(frame.into()));
        } else {
            tracing::debug!(event, "emit while disconnected — dropped");
        }
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> ListenerHandle {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        ListenerHandle::new(event, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle) {
        if let Some(mut entry) = self.inner.listeners.get_mut(handle.event()) {
            entry.retain(|(id, _)| *id != handle.id());
        }
    }
}
