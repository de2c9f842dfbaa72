use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc;

use crate::error::{CourierError, CourierResult};

pub const NOTIFICATIONS_CHANNEL: &str = "NotificationsChannel";
pub const CONVERSATIONS_CHANNEL: &str = "ConversationsChannel";

/// Names one realtime channel plus its subscription params, e.g.
/// `{"channel":"ConversationsChannel","conversation_id":12}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentifier {
    channel: String,
    params: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct WireIdentifier<'a> {
    channel: &'a str,
    #[serde(flatten)]
    params: &'a BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct OwnedWireIdentifier {
    channel: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

impl ChannelIdentifier {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The JSON string used as the subscription key on the wire.
    pub fn to_wire(&self) -> String {
        let wire = WireIdentifier {
            channel: &self.channel,
            params: &self.params,
        };
        // A string key plus JSON values always serializes.
        serde_json::to_string(&wire).unwrap_or_else(|_| format!("{{\"channel\":\"{}\"}}", self.channel))
    }

    pub fn from_wire(raw: &str) -> CourierResult<Self> {
        let parsed: OwnedWireIdentifier = serde_json::from_str(raw)?;
        Ok(Self {
            channel: parsed.channel,
            params: parsed.params.into_iter().collect(),
        })
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// One open realtime channel. Events arrive in delivery order; dropping the
/// handle (or calling [`Subscription::unsubscribe`]) releases the channel.
pub struct Subscription {
    identifier: ChannelIdentifier,
    events: mpsc::UnboundedReceiver<Value>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        identifier: ChannelIdentifier,
        events: mpsc::UnboundedReceiver<Value>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            identifier,
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn identifier(&self) -> &ChannelIdentifier {
        &self.identifier
    }

    /// Next pushed payload, or `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<Value> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("identifier", &self.identifier.to_wire())
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Realtime pub/sub transport.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn subscribe(&self, identifier: ChannelIdentifier) -> CourierResult<Subscription>;
}

/// Pull a typed field (`notification`, `message`) out of a pushed payload.
pub fn payload_field<T: serde::de::DeserializeOwned>(payload: &Value, field: &str) -> CourierResult<T> {
    let inner = payload
        .get(field)
        .cloned()
        .ok_or_else(|| CourierError::Transport(format!("Payload has no `{}` field", field)))?;
    Ok(serde_json::from_value(inner)?)
}
