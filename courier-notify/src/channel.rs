use std::sync::Arc;

use courier_core::pubsub::payload_field;
use courier_core::types::{Notification, NotificationId, SoundCategory};
use courier_core::{ApiClient, ChannelIdentifier, CourierContext, PubSub, NOTIFICATIONS_CHANNEL};
use courier_delivery::{spawn_play, SoundPlayer};
use futures_util::future::join_all;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing;

use crate::inbox::NotificationInbox;

struct ChannelState {
    inbox: NotificationInbox,
    disposed: bool,
}

/// Live view of the signed-in user's notifications.
///
/// Opening fetches the current list and subscribes to
/// `NotificationsChannel`; pushed notifications are prepended and play a
/// sound once. Read-state changes are applied locally first and mirrored to
/// the API on a best-effort basis.
pub struct NotificationChannel {
    state: Arc<RwLock<ChannelState>>,
    api: Arc<dyn ApiClient>,
    unread_tx: Arc<watch::Sender<usize>>,
    task: JoinHandle<()>,
}

impl NotificationChannel {
    /// Start the channel. The list fetch and the subscription run
    /// concurrently in the background; pushes are applied only after the
    /// fetched list.
    pub fn open(ctx: &CourierContext, sounds: Arc<dyn SoundPlayer>) -> Self {
        let state = Arc::new(RwLock::new(ChannelState {
            inbox: NotificationInbox::new(),
            disposed: false,
        }));
        let (unread_tx, _) = watch::channel(0usize);
        let unread_tx = Arc::new(unread_tx);

        let task = tokio::spawn(run(
            state.clone(),
            ctx.api.clone(),
            ctx.realtime.clone(),
            sounds,
            unread_tx.clone(),
        ));

        Self {
            state,
            api: ctx.api.clone(),
            unread_tx,
            task,
        }
    }

    pub async fn snapshot(&self) -> Vec<Notification> {
        self.state.read().await.inbox.notifications().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.state.read().await.inbox.unread_count()
    }

    /// Receiver that observes every unread-count change.
    pub fn watch_unread(&self) -> watch::Receiver<usize> {
        self.unread_tx.subscribe()
    }

    pub async fn mark_as_read(&self, id: NotificationId) {
        let changed = {
            let mut state = self.state.write().await;
            if state.disposed {
                return;
            }
            let changed = state.inbox.mark_read(id);
            self.unread_tx.send_replace(state.inbox.unread_count());
            changed
        };

        if !changed {
            tracing::debug!("Notification {} already read or unknown, skipping API call", id);
            return;
        }

        if let Err(e) = self.api.mark_notification_read(id).await {
            tracing::error!("Failed to mark notification {} as read: {}", id, e);
        }
    }

    pub async fn mark_all_as_read(&self) {
        let ids = {
            let mut state = self.state.write().await;
            if state.disposed {
                return;
            }
            let ids = state.inbox.mark_all_read();
            self.unread_tx.send_replace(0);
            ids
        };

        if ids.is_empty() {
            return;
        }

        let api = &self.api;
        let results = join_all(ids.iter().map(|id| api.mark_notification_read(*id))).await;
        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!("Failed to mark notification {} as read: {}", id, e);
            }
        }
    }

    /// Re-fetch the list from the API, replacing local state. Failures leave
    /// the current state untouched.
    pub async fn refresh(&self) {
        match self.api.list_notifications().await {
            Ok(list) => apply_fetch(&self.state, &self.unread_tx, list).await,
            Err(e) => tracing::error!("Failed to refresh notifications: {}", e),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.disposed
    }

    /// Stop live updates and release the subscription. Results of requests
    /// still in flight are discarded.
    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        self.task.abort();
        tracing::debug!("Notification channel closed");
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn apply_fetch(
    state: &RwLock<ChannelState>,
    unread_tx: &watch::Sender<usize>,
    list: Vec<Notification>,
) {
    let mut state = state.write().await;
    if state.disposed {
        tracing::debug!("Discarding notification fetch for closed channel");
        return;
    }
    state.inbox.replace(list);
    unread_tx.send_replace(state.inbox.unread_count());
}

async fn run(
    state: Arc<RwLock<ChannelState>>,
    api: Arc<dyn ApiClient>,
    realtime: Arc<dyn PubSub>,
    sounds: Arc<dyn SoundPlayer>,
    unread_tx: Arc<watch::Sender<usize>>,
) {
    let fetch = async {
        match api.list_notifications().await {
            Ok(list) => {
                tracing::debug!("Fetched {} notifications", list.len());
                apply_fetch(&state, &unread_tx, list).await;
            }
            Err(e) => tracing::error!("Failed to fetch notifications: {}", e),
        }
    };
    let subscribe = realtime.subscribe(ChannelIdentifier::new(NOTIFICATIONS_CHANNEL));

    let ((), subscription) = tokio::join!(fetch, subscribe);

    let mut subscription = match subscription {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::error!("Notification subscription failed, continuing without live updates: {}", e);
            return;
        }
    };

    while let Some(payload) = subscription.next().await {
        let notification: Notification = match payload_field(&payload, "notification") {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!("Ignoring notification event: {}", e);
                continue;
            }
        };

        let sound = SoundCategory::from(notification.category);
        {
            let mut state = state.write().await;
            if state.disposed {
                break;
            }
            tracing::debug!("Received notification {}", notification.id);
            state.inbox.prepend(notification);
            unread_tx.send_replace(state.inbox.unread_count());
        }

        spawn_play(sounds.clone(), sound);
    }

    tracing::debug!("Subscription {} ended", subscription.identifier());
}
