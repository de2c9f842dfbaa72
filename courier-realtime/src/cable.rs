use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::config::RealtimeConfig;
use courier_core::{ChannelIdentifier, CourierError, CourierResult, PubSub, Session, Subscription};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing;
use uuid::Uuid;

use crate::protocol::{parse_frame, CableCommand, ServerFrame, SUBPROTOCOL};

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

type ConfirmSender = oneshot::Sender<Result<(), String>>;

#[derive(Default)]
struct ChannelRoute {
    subscribers: Vec<(u64, mpsc::UnboundedSender<Value>)>,
    pending: Vec<ConfirmSender>,
    confirmed: bool,
}

/// Routing table shared by the reader task, the client and every
/// subscription's release hook. Keyed by wire identifier.
#[derive(Default)]
struct CableShared {
    routes: Mutex<HashMap<String, ChannelRoute>>,
    next_subscriber: AtomicU64,
    connected: AtomicBool,
}

impl CableShared {
    fn routes(&self) -> MutexGuard<'_, HashMap<String, ChannelRoute>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn confirm(&self, identifier: &str) {
        let mut routes = self.routes();
        match routes.get_mut(identifier) {
            Some(route) => {
                route.confirmed = true;
                for waiter in route.pending.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
            }
            None => tracing::debug!("Confirmation for unknown subscription {}", identifier),
        }
    }

    fn reject(&self, identifier: &str) {
        // Dropping the route closes every subscriber stream on it.
        if let Some(route) = self.routes().remove(identifier) {
            for waiter in route.pending {
                let _ = waiter.send(Err("rejected by server".to_string()));
            }
        }
    }

    fn deliver(&self, identifier: &str, message: Value) {
        let mut routes = self.routes();
        let route = match routes.get_mut(identifier) {
            Some(route) => route,
            None => {
                tracing::debug!("Dropping frame for unsubscribed channel {}", identifier);
                return;
            }
        };
        route
            .subscribers
            .retain(|(_, events)| events.send(message.clone()).is_ok());
    }

    fn shutdown(&self, reason: &str) {
        self.connected.store(false, Ordering::Release);
        for (_, route) in self.routes().drain() {
            for waiter in route.pending {
                let _ = waiter.send(Err(reason.to_string()));
            }
        }
    }
}

/// WebSocket pub/sub client speaking the ActionCable JSON protocol.
///
/// One reader task routes server frames to subscriptions, one writer task
/// owns the sink. There is no reconnect: once the socket closes every
/// subscription stream ends and new subscriptions fail.
pub struct CableClient {
    shared: Arc<CableShared>,
    outgoing: mpsc::UnboundedSender<Message>,
    connection_id: Uuid,
    reader: JoinHandle<()>,
}

impl CableClient {
    pub async fn connect(config: &RealtimeConfig, session: &Session) -> CourierResult<Self> {
        let url = cable_url(&config.cable_url, session);
        let mut request = url.as_str().into_client_request().map_err(|e| {
            CourierError::Transport(format!("Invalid cable URL {}: {}", config.cable_url, e))
        })?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

        let (stream, _) = tokio_tungstenite::connect_async(request).await.map_err(|e| {
            CourierError::Transport(format!("Failed to connect to {}: {}", config.cable_url, e))
        })?;

        let connection_id = Uuid::new_v4();
        tracing::info!("Cable connection {} established to {}", connection_id, config.cable_url);

        let (mut sink, mut source) = stream.split();
        let shared = Arc::new(CableShared::default());
        shared.connected.store(true, Ordering::Release);

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::warn!("Failed to write cable frame: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_shared = shared.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => handle_text(&reader_shared, connection_id, &text),
                    Ok(Message::Close(frame)) => {
                        tracing::info!("Cable connection {} closed by server: {:?}", connection_id, frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Cable connection {} read error: {}", connection_id, e);
                        break;
                    }
                }
            }
            reader_shared.shutdown("connection closed");
        });

        Ok(Self {
            shared,
            outgoing,
            connection_id,
            reader,
        })
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Close the socket. Open subscriptions see their stream end.
    pub fn close(&self) {
        if self.is_connected() {
            tracing::info!("Closing cable connection {}", self.connection_id);
        }
        let _ = self.outgoing.send(Message::Close(None));
        self.shared.shutdown("client closed");
    }
}

impl Drop for CableClient {
    fn drop(&mut self) {
        self.close();
        self.reader.abort();
    }
}

#[async_trait]
impl PubSub for CableClient {
    async fn subscribe(&self, identifier: ChannelIdentifier) -> CourierResult<Subscription> {
        let channel = identifier.channel().to_string();
        if !self.is_connected() {
            return Err(CourierError::Subscription {
                channel,
                reason: "connection closed".to_string(),
            });
        }

        let wire = identifier.to_wire();
        let subscriber_id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (confirm_tx, confirm_rx) = oneshot::channel();

        let (fresh, awaiting) = {
            let mut routes = self.shared.routes();
            let fresh = !routes.contains_key(&wire);
            let route = routes.entry(wire.clone()).or_default();
            route.subscribers.push((subscriber_id, events_tx));
            let awaiting = !route.confirmed;
            if awaiting {
                route.pending.push(confirm_tx);
            }
            (fresh, awaiting)
        };

        if fresh {
            let text = CableCommand::subscribe(&identifier).to_text()?;
            if self.outgoing.send(Message::Text(text)).is_err() {
                release_subscriber(&self.shared, &self.outgoing, &wire, subscriber_id);
                return Err(CourierError::Subscription {
                    channel,
                    reason: "connection closed".to_string(),
                });
            }
        }

        if awaiting {
            let outcome = match tokio::time::timeout(SUBSCRIBE_TIMEOUT, confirm_rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err("connection closed".to_string()),
                Err(_) => Err("timed out waiting for confirmation".to_string()),
            };
            if let Err(reason) = outcome {
                release_subscriber(&self.shared, &self.outgoing, &wire, subscriber_id);
                tracing::warn!("Subscription to {} failed: {}", wire, reason);
                return Err(CourierError::Subscription { channel, reason });
            }
        }

        tracing::info!("Subscribed to {}", wire);

        let shared = Arc::downgrade(&self.shared);
        let outgoing = self.outgoing.clone();
        Ok(Subscription::new(identifier, events_rx, move || {
            if let Some(shared) = shared.upgrade() {
                release_subscriber(&shared, &outgoing, &wire, subscriber_id);
            }
        }))
    }
}

/// Remove one subscriber; the last one out unsubscribes on the server.
fn release_subscriber(
    shared: &CableShared,
    outgoing: &mpsc::UnboundedSender<Message>,
    wire: &str,
    subscriber_id: u64,
) {
    let now_empty = {
        let mut routes = shared.routes();
        match routes.get_mut(wire) {
            Some(route) => {
                route.subscribers.retain(|(id, _)| *id != subscriber_id);
                if route.subscribers.is_empty() {
                    routes.remove(wire);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    };

    if now_empty && shared.connected.load(Ordering::Acquire) {
        match CableCommand::unsubscribe(wire).to_text() {
            Ok(text) => {
                let _ = outgoing.send(Message::Text(text));
                tracing::info!("Unsubscribed from {}", wire);
            }
            Err(e) => tracing::error!("Failed to encode unsubscribe for {}: {}", wire, e),
        }
    }
}

fn handle_text(shared: &CableShared, connection_id: Uuid, text: &str) {
    let frame = match parse_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Ignoring malformed cable frame: {}", e);
            return;
        }
    };

    match frame {
        ServerFrame::Welcome => tracing::debug!("Cable connection {} welcomed", connection_id),
        ServerFrame::Ping => tracing::trace!("Cable ping on {}", connection_id),
        ServerFrame::Confirm { identifier } => shared.confirm(&identifier),
        ServerFrame::Reject { identifier } => {
            tracing::warn!("Server rejected subscription {}", identifier);
            shared.reject(&identifier);
        }
        ServerFrame::Disconnect { reason, reconnect } => {
            tracing::warn!(
                "Server requested disconnect of {} (reason: {:?}, reconnect: {})",
                connection_id,
                reason,
                reconnect
            );
        }
        ServerFrame::Data { identifier, message } => shared.deliver(&identifier, message),
        ServerFrame::Unknown(kind) => tracing::debug!("Ignoring unknown cable frame: {}", kind),
    }
}

/// Append the session token as a `token` query param.
fn cable_url(base: &str, session: &Session) -> String {
    if !session.is_authenticated() {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base, separator, session.token())
}
