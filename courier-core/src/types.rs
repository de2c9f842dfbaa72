use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type NotificationId = i64;
pub type MessageId = i64;
pub type AppointmentId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    fn from_wire(value: &str) -> Self {
        match value {
            "success" => Self::Success,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Blog,
    Message,
    Appointment,
    Career,
    #[default]
    General,
}

impl NotificationCategory {
    fn from_wire(value: &str) -> Self {
        match value {
            "blog" => Self::Blog,
            "message" => Self::Message,
            "appointment" => Self::Appointment,
            "career" => Self::Career,
            _ => Self::General,
        }
    }
}

/// Static sound assets, one per alert family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCategory {
    Notification,
    Message,
    Appointment,
}

impl SoundCategory {
    pub fn asset_name(&self) -> &'static str {
        match self {
            Self::Notification => "notification.mp3",
            Self::Message => "message.mp3",
            Self::Appointment => "appointment.mp3",
        }
    }
}

impl From<NotificationCategory> for SoundCategory {
    fn from(category: NotificationCategory) -> Self {
        match category {
            NotificationCategory::Message => Self::Message,
            NotificationCategory::Appointment => Self::Appointment,
            _ => Self::Notification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_type")]
    pub notification_type: NotificationType,
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: NotificationCategory,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    #[serde(alias = "conversation_id")]
    pub conversation_id: i64,
    #[serde(alias = "sender_id")]
    pub sender_id: UserId,
    #[serde(alias = "receiver_id")]
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub conversation_id: i64,
    pub receiver_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    fn from_wire(value: &str) -> Self {
        match value {
            "confirmed" => Self::Confirmed,
            "completed" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Scheduled,
        }
    }

    /// Whether reminders may still fire for an appointment in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(alias = "scheduled_at")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub scheduled_at: DateTime<Utc>,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

fn lenient_type<'de, D: Deserializer<'de>>(d: D) -> Result<NotificationType, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().map(NotificationType::from_wire).unwrap_or_default())
}

fn lenient_category<'de, D: Deserializer<'de>>(d: D) -> Result<NotificationCategory, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().map(NotificationCategory::from_wire).unwrap_or_default())
}

fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<AppointmentStatus, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().map(AppointmentStatus::from_wire).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_accepts_snake_case_and_unknown_enums() {
        let raw = serde_json::json!({
            "id": 7,
            "title": "Shipment delayed",
            "message": "Container 42 is held at customs",
            "type": "critical",
            "category": "customs",
            "created_at": "2026-10-17T08:00:00Z"
        });

        let notification: Notification = serde_json::from_value(raw).unwrap();
        assert_eq!(notification.id, 7);
        assert_eq!(notification.notification_type, NotificationType::Info);
        assert_eq!(notification.category, NotificationCategory::General);
        assert!(!notification.read);
        assert!(notification.link.is_none());
    }

    #[test]
    fn notification_serializes_camel_case() {
        let raw = serde_json::json!({
            "id": 1,
            "title": "New post",
            "message": "Read our latest blog post",
            "type": "success",
            "category": "blog",
            "createdAt": "2026-10-17T08:00:00Z",
            "read": true,
            "link": "/blog/1"
        });

        let notification: Notification = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_value(&notification).unwrap();
        assert_eq!(out["type"], "success");
        assert_eq!(out["category"], "blog");
        assert_eq!(out["createdAt"], "2026-10-17T08:00:00Z");
        assert_eq!(out["link"], "/blog/1");
    }

    #[test]
    fn appointment_status_defaults_to_scheduled() {
        let raw = serde_json::json!({
            "id": 3,
            "scheduledAt": "2026-10-17T09:30:00Z",
            "purpose": "Warehouse tour"
        });

        let appointment: Appointment = serde_json::from_value(raw).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert!(appointment.status.is_active());
        assert!(!AppointmentStatus::from_wire("canceled").is_active());
    }

    #[test]
    fn sound_category_follows_notification_category() {
        assert_eq!(SoundCategory::from(NotificationCategory::Message), SoundCategory::Message);
        assert_eq!(SoundCategory::from(NotificationCategory::Appointment), SoundCategory::Appointment);
        assert_eq!(SoundCategory::from(NotificationCategory::Career), SoundCategory::Notification);
        assert_eq!(SoundCategory::Appointment.asset_name(), "appointment.mp3");
    }
}
