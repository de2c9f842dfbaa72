use std::sync::Arc;

use courier_core::pubsub::payload_field;
use courier_core::types::{Message, MessageId, NewMessage, SoundCategory, UserId};
use courier_core::{ApiClient, ChannelIdentifier, CourierContext, PubSub, Session, CONVERSATIONS_CHANNEL};
use courier_delivery::{spawn_play, SoundPlayer};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing;

use crate::thread::ConversationThread;

struct ChannelState {
    thread: ConversationThread,
    disposed: bool,
}

/// Live view of a single conversation between the session user and a peer.
pub struct ConversationChannel {
    conversation_id: i64,
    state: Arc<RwLock<ChannelState>>,
    api: Arc<dyn ApiClient>,
    task: JoinHandle<()>,
}

impl ConversationChannel {
    /// Start the channel. History fetch and subscription run concurrently;
    /// pushed messages are appended after the history.
    pub fn open(ctx: &CourierContext, conversation_id: i64, sounds: Arc<dyn SoundPlayer>) -> Self {
        let state = Arc::new(RwLock::new(ChannelState {
            thread: ConversationThread::new(conversation_id),
            disposed: false,
        }));

        let task = tokio::spawn(run(
            state.clone(),
            ctx.api.clone(),
            ctx.realtime.clone(),
            ctx.session.clone(),
            sounds,
            conversation_id,
        ));

        Self {
            conversation_id,
            state,
            api: ctx.api.clone(),
            task,
        }
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.state.read().await.thread.messages().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.state.read().await.thread.unread_count()
    }

    /// Post a message without waiting for the result. The sent message shows
    /// up in the thread once the server echoes it over the channel.
    pub fn send_message(&self, receiver_id: UserId, content: impl Into<String>) -> JoinHandle<()> {
        let api = self.api.clone();
        let message = NewMessage {
            conversation_id: self.conversation_id,
            receiver_id,
            content: content.into(),
        };

        tokio::spawn(async move {
            match api.send_message(&message).await {
                Ok(sent) => tracing::debug!("Sent message {} to conversation {}", sent.id, sent.conversation_id),
                Err(e) => tracing::error!(
                    "Failed to send message to conversation {}: {}",
                    message.conversation_id,
                    e
                ),
            }
        })
    }

    /// Flip the local read flag and mirror it to the API in the background.
    pub async fn mark_as_read(&self, id: MessageId) -> JoinHandle<()> {
        let changed = {
            let mut state = self.state.write().await;
            !state.disposed && state.thread.mark_read(id)
        };

        let api = self.api.clone();
        tokio::spawn(async move {
            if !changed {
                tracing::debug!("Message {} already read or unknown, skipping API call", id);
                return;
            }
            if let Err(e) = api.mark_message_read(id).await {
                tracing::error!("Failed to mark message {} as read: {}", id, e);
            }
        })
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.disposed
    }

    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        self.task.abort();
        tracing::debug!("Conversation {} channel closed", self.conversation_id);
    }
}

impl Drop for ConversationChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    state: Arc<RwLock<ChannelState>>,
    api: Arc<dyn ApiClient>,
    realtime: Arc<dyn PubSub>,
    session: Session,
    sounds: Arc<dyn SoundPlayer>,
    conversation_id: i64,
) {
    let fetch = async {
        match api.list_messages(conversation_id).await {
            Ok(history) => {
                let mut state = state.write().await;
                if state.disposed {
                    return;
                }
                tracing::debug!("Fetched {} messages for conversation {}", history.len(), conversation_id);
                state.thread.load_history(history);
            }
            Err(e) => tracing::error!("Failed to fetch conversation {}: {}", conversation_id, e),
        }
    };
    let identifier =
        ChannelIdentifier::new(CONVERSATIONS_CHANNEL).with_param("conversation_id", conversation_id);
    let subscribe = realtime.subscribe(identifier);

    let ((), subscription) = tokio::join!(fetch, subscribe);

    let mut subscription = match subscription {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::error!(
                "Conversation {} subscription failed, continuing without live updates: {}",
                conversation_id,
                e
            );
            return;
        }
    };

    while let Some(payload) = subscription.next().await {
        let message: Message = match payload_field(&payload, "message") {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Ignoring conversation event: {}", e);
                continue;
            }
        };

        let sender_id = message.sender_id;
        {
            let mut state = state.write().await;
            if state.disposed {
                break;
            }
            if !state.thread.append(message) {
                tracing::debug!("Ignoring message for another conversation");
                continue;
            }
        }

        if !session.is_self(sender_id) {
            spawn_play(sounds.clone(), SoundCategory::Message);
        }
    }

    tracing::debug!("Subscription {} ended", subscription.identifier());
}
