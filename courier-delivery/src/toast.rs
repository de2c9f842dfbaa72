use chrono::{DateTime, Utc};
use courier_core::types::{NotificationCategory, NotificationType};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing;
use uuid::Uuid;

/// A transient on-screen alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            kind,
            category,
            created_at: Utc::now(),
        }
    }
}

pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Writes toasts to the log. Used by the headless runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToasts;

impl ToastSink for TracingToasts {
    fn show(&self, toast: Toast) {
        match toast.kind {
            NotificationType::Error => {
                tracing::error!(category = ?toast.category, "{}: {}", toast.title, toast.message)
            }
            NotificationType::Warning => {
                tracing::warn!(category = ?toast.category, "{}: {}", toast.title, toast.message)
            }
            _ => tracing::info!(category = ?toast.category, "{}: {}", toast.title, toast.message),
        }
    }
}

/// Buffers toasts until a UI drains them.
#[derive(Debug, Default, Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<VecDeque<Toast>>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Toast>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.queue().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }
}

impl ToastSink for ToastQueue {
    fn show(&self, toast: Toast) {
        self.queue().push_back(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_drains_in_arrival_order() {
        let queue = ToastQueue::new();
        queue.show(Toast::new("First", "a", NotificationType::Info, NotificationCategory::General));
        queue.show(Toast::new("Second", "b", NotificationType::Warning, NotificationCategory::Appointment));

        assert_eq!(queue.len(), 2);
        let toasts = queue.drain();
        assert_eq!(toasts[0].title, "First");
        assert_eq!(toasts[1].category, NotificationCategory::Appointment);
        assert!(queue.is_empty());
    }

    #[test]
    fn toast_ids_are_unique() {
        let a = Toast::new("A", "", NotificationType::Info, NotificationCategory::General);
        let b = Toast::new("A", "", NotificationType::Info, NotificationCategory::General);
        assert_ne!(a.id, b.id);
    }
}
