use courier_core::types::{Notification, NotificationId};

/// Local notification list, newest first, with its unread count.
///
/// Every mutation keeps `unread_count() == count(read == false)`.
#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    notifications: Vec<Notification>,
    unread: usize,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(notifications: Vec<Notification>) -> Self {
        let mut inbox = Self::new();
        inbox.replace(notifications);
        inbox
    }

    /// Swap in a freshly fetched list.
    pub fn replace(&mut self, notifications: Vec<Notification>) {
        self.unread = notifications.iter().filter(|n| !n.read).count();
        self.notifications = notifications;
    }

    /// Add a pushed notification at the top. Ids are not checked against the
    /// existing list.
    pub fn prepend(&mut self, notification: Notification) {
        if !notification.read {
            self.unread += 1;
        }
        self.notifications.insert(0, notification);
    }

    /// Mark every entry with `id` read. Returns false when nothing changed.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        let mut changed = 0;
        for notification in self.notifications.iter_mut().filter(|n| n.id == id && !n.read) {
            notification.read = true;
            changed += 1;
        }
        self.unread -= changed;
        changed > 0
    }

    /// Mark everything read and return the ids that were unread, each once.
    pub fn mark_all_read(&mut self) -> Vec<NotificationId> {
        let mut ids: Vec<NotificationId> = Vec::new();
        for notification in self.notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            if !ids.contains(&notification.id) {
                ids.push(notification.id);
            }
        }
        self.unread = 0;
        ids
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
