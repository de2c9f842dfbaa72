use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use courier_core::{ChannelIdentifier, CourierError, CourierResult, PubSub, Subscription};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing;

/// In-process pub/sub hub. Same delivery semantics as the cable client:
/// per-subscription ordering, release on drop.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    channels: HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>,
    rejected: HashSet<String>,
    next_id: u64,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push a payload to every subscriber of `identifier`. Returns how many
    /// subscribers received it.
    pub fn publish(&self, identifier: &ChannelIdentifier, payload: Value) -> usize {
        let mut state = self.state();
        let Some(subscribers) = state.channels.get_mut(&identifier.to_wire()) else {
            tracing::debug!("No subscribers on {}", identifier);
            return 0;
        };
        subscribers.retain(|(_, events)| events.send(payload.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self, identifier: &ChannelIdentifier) -> usize {
        self.state()
            .channels
            .get(&identifier.to_wire())
            .map_or(0, Vec::len)
    }

    /// Refuse future subscriptions to `identifier`.
    pub fn reject(&self, identifier: &ChannelIdentifier) {
        self.state().rejected.insert(identifier.to_wire());
    }
}

#[async_trait]
impl PubSub for LocalHub {
    async fn subscribe(&self, identifier: ChannelIdentifier) -> CourierResult<Subscription> {
        let wire = identifier.to_wire();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let id = {
            let mut state = self.state();
            if state.rejected.contains(&wire) {
                return Err(CourierError::Subscription {
                    channel: identifier.channel().to_string(),
                    reason: "rejected by hub".to_string(),
                });
            }
            state.next_id += 1;
            let id = state.next_id;
            state.channels.entry(wire.clone()).or_default().push((id, events_tx));
            id
        };

        let hub = self.inner.clone();
        Ok(Subscription::new(identifier, events_rx, move || {
            let mut state = hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(subscribers) = state.channels.get_mut(&wire) {
                subscribers.retain(|(sid, _)| *sid != id);
                if subscribers.is_empty() {
                    state.channels.remove(&wire);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{CONVERSATIONS_CHANNEL, NOTIFICATIONS_CHANNEL};

    #[tokio::test]
    async fn publishes_only_to_matching_identifier() {
        let hub = LocalHub::new();
        let room_a = ChannelIdentifier::new(CONVERSATIONS_CHANNEL).with_param("conversation_id", 1);
        let room_b = ChannelIdentifier::new(CONVERSATIONS_CHANNEL).with_param("conversation_id", 2);

        let mut sub_a = hub.subscribe(room_a.clone()).await.unwrap();
        let _sub_b = hub.subscribe(room_b.clone()).await.unwrap();

        assert_eq!(hub.publish(&room_a, serde_json::json!({"message": {"id": 1}})), 1);
        assert_eq!(sub_a.next().await.unwrap()["message"]["id"], 1);
    }

    #[tokio::test]
    async fn dropping_subscription_releases_it() {
        let hub = LocalHub::new();
        let id = ChannelIdentifier::new(NOTIFICATIONS_CHANNEL);

        let sub = hub.subscribe(id.clone()).await.unwrap();
        assert_eq!(hub.subscriber_count(&id), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(&id), 0);
        assert_eq!(hub.publish(&id, serde_json::json!({})), 0);
    }

    #[tokio::test]
    async fn rejected_identifier_fails_to_subscribe() {
        let hub = LocalHub::new();
        let id = ChannelIdentifier::new(NOTIFICATIONS_CHANNEL);
        hub.reject(&id);

        let err = hub.subscribe(id).await.unwrap_err();
        assert!(matches!(err, CourierError::Subscription { .. }));
    }
}
