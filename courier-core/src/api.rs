use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing;

use crate::config::ApiConfig;
use crate::error::{CourierError, CourierResult};
use crate::session::Session;
use crate::types::{
    Appointment, AppointmentId, AppointmentUpdate, Message, MessageId, NewAppointment, NewMessage,
    NewNotification, Notification, NotificationId,
};

/// REST backend consumed by the channels and the reminder feed.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn list_notifications(&self) -> CourierResult<Vec<Notification>>;
    async fn create_notification(&self, notification: &NewNotification) -> CourierResult<Notification>;
    async fn mark_notification_read(&self, id: NotificationId) -> CourierResult<()>;

    async fn list_messages(&self, conversation_id: i64) -> CourierResult<Vec<Message>>;
    async fn send_message(&self, message: &NewMessage) -> CourierResult<Message>;
    async fn mark_message_read(&self, id: MessageId) -> CourierResult<()>;

    async fn list_appointments(&self) -> CourierResult<Vec<Appointment>>;
    async fn get_appointment(&self, id: AppointmentId) -> CourierResult<Appointment>;
    async fn create_appointment(&self, appointment: &NewAppointment) -> CourierResult<Appointment>;
    async fn update_appointment(
        &self,
        id: AppointmentId,
        update: &AppointmentUpdate,
    ) -> CourierResult<Appointment>;
    async fn delete_appointment(&self, id: AppointmentId) -> CourierResult<()>;
}

pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig, session: Session) -> CourierResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(CourierError::Config("API base URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        tracing::info!("API client targeting {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match self.session.bearer() {
            Some(bearer) => builder.header("Authorization", bearer),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> CourierResult<Value> {
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CourierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn list_notifications(&self) -> CourierResult<Vec<Notification>> {
        let body = self.send(self.request(Method::GET, "/api/notifications")).await?;
        decode_list(body, "notifications")
    }

    async fn create_notification(&self, notification: &NewNotification) -> CourierResult<Notification> {
        let body = self
            .send(self.request(Method::POST, "/api/notifications").json(notification))
            .await?;
        decode_item(body, "notification")
    }

    async fn mark_notification_read(&self, id: NotificationId) -> CourierResult<()> {
        self.send(self.request(Method::POST, &format!("/api/notifications/{}/read", id)))
            .await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: i64) -> CourierResult<Vec<Message>> {
        let body = self
            .send(
                self.request(Method::GET, "/api/messages")
                    .query(&[("conversation_id", conversation_id)]),
            )
            .await?;
        decode_list(body, "messages")
    }

    async fn send_message(&self, message: &NewMessage) -> CourierResult<Message> {
        let body = self
            .send(self.request(Method::POST, "/api/messages").json(message))
            .await?;
        decode_item(body, "message")
    }

    async fn mark_message_read(&self, id: MessageId) -> CourierResult<()> {
        self.send(self.request(Method::POST, &format!("/api/messages/{}/read", id)))
            .await?;
        Ok(())
    }

    async fn list_appointments(&self) -> CourierResult<Vec<Appointment>> {
        let body = self.send(self.request(Method::GET, "/api/appointments")).await?;
        decode_list(body, "appointments")
    }

    async fn get_appointment(&self, id: AppointmentId) -> CourierResult<Appointment> {
        let body = self
            .send(self.request(Method::GET, &format!("/api/appointments/{}", id)))
            .await?;
        decode_item(body, "appointment")
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> CourierResult<Appointment> {
        let body = self
            .send(self.request(Method::POST, "/api/appointments").json(appointment))
            .await?;
        decode_item(body, "appointment")
    }

    async fn update_appointment(
        &self,
        id: AppointmentId,
        update: &AppointmentUpdate,
    ) -> CourierResult<Appointment> {
        let body = self
            .send(
                self.request(Method::PATCH, &format!("/api/appointments/{}", id))
                    .json(update),
            )
            .await?;
        decode_item(body, "appointment")
    }

    async fn delete_appointment(&self, id: AppointmentId) -> CourierResult<()> {
        self.send(self.request(Method::DELETE, &format!("/api/appointments/{}", id)))
            .await?;
        Ok(())
    }
}

/// Lists come back either bare or wrapped under the resource name.
fn decode_list<T: DeserializeOwned>(body: Value, key: &str) -> CourierResult<Vec<T>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) if map.contains_key(key) => {
            let inner = map.remove(key).unwrap_or(Value::Null);
            decode_list(inner, key)
        }
        other => Ok(serde_json::from_value(other)?),
    }
}

fn decode_item<T: DeserializeOwned>(body: Value, key: &str) -> CourierResult<T> {
    match body {
        Value::Object(mut map) if map.get(key).map_or(false, Value::is_object) => {
            let inner = map.remove(key).unwrap_or(Value::Null);
            Ok(serde_json::from_value(inner)?)
        }
        other => Ok(serde_json::from_value(other)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppointmentStatus, NotificationCategory, NotificationType};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpApiClient {
        let config = ApiConfig {
            base_url: format!("{}/", server.uri()),
            timeout_secs: 5,
        };
        HttpApiClient::new(&config, Session::new("dispatch-token", Some(1))).unwrap()
    }

    #[tokio::test]
    async fn lists_wrapped_notifications_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications"))
            .and(header("Authorization", "Bearer dispatch-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "notifications": [{
                    "id": 1,
                    "title": "Invoice ready",
                    "message": "Invoice 1001 is ready",
                    "type": "success",
                    "category": "general",
                    "createdAt": "2026-10-17T08:00:00Z",
                    "read": false
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifications = client_for(&server).list_notifications().await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type, NotificationType::Success);
    }

    #[tokio::test]
    async fn lists_messages_for_a_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages"))
            .and(query_param("conversation_id", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 5,
                "conversation_id": 12,
                "sender_id": 2,
                "receiver_id": 1,
                "content": "Pallets arrived",
                "read": false,
                "created_at": "2026-10-17T08:00:00Z"
            }])))
            .mount(&server)
            .await;

        let messages = client_for(&server).list_messages(12).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, 2);
    }

    #[tokio::test]
    async fn mark_read_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/9/read"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).mark_notification_read(9).await.unwrap();
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/messages/3/read"))
            .respond_with(ResponseTemplate::new(422).set_body_string("already archived"))
            .mount(&server)
            .await;

        let err = client_for(&server).mark_message_read(3).await.unwrap_err();
        match err {
            CourierError::Status { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "already archived");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn creates_notification_from_wrapped_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications"))
            .and(body_json(serde_json::json!({
                "title": "Career fair",
                "message": "Join us on Friday",
                "type": "info",
                "category": "career"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "notification": {
                    "id": 77,
                    "title": "Career fair",
                    "message": "Join us on Friday",
                    "type": "info",
                    "category": "career",
                    "createdAt": "2026-10-17T08:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_notification(&NewNotification {
                title: "Career fair".to_string(),
                message: "Join us on Friday".to_string(),
                notification_type: NotificationType::Info,
                category: NotificationCategory::Career,
                link: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 77);
        assert_eq!(created.category, NotificationCategory::Career);
    }

    #[tokio::test]
    async fn updates_appointment_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/appointments/4"))
            .and(body_json(serde_json::json!({ "status": "cancelled" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 4,
                "scheduledAt": "2026-10-17T10:00:00Z",
                "purpose": "Freight quote review",
                "status": "cancelled"
            })))
            .mount(&server)
            .await;

        let update = AppointmentUpdate {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        let appointment = client_for(&server).update_appointment(4, &update).await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn gets_wrapped_appointment_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appointments/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "appointment": {
                    "id": 9,
                    "scheduled_at": "2026-10-17T11:30:00Z",
                    "purpose": "Customs broker call",
                    "status": "confirmed"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let appointment = client_for(&server).get_appointment(9).await.unwrap();
        assert_eq!(appointment.id, 9);
        assert_eq!(appointment.purpose, "Customs broker call");
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn creates_appointment_with_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/appointments"))
            .and(body_json(serde_json::json!({
                "scheduledAt": "2026-10-17T15:00:00Z",
                "purpose": "Warehouse walkthrough"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 12,
                "scheduledAt": "2026-10-17T15:00:00Z",
                "purpose": "Warehouse walkthrough"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_appointment(&NewAppointment {
                scheduled_at: "2026-10-17T15:00:00Z".parse().unwrap(),
                purpose: "Warehouse walkthrough".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 12);
        assert_eq!(created.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn deletes_appointment_with_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/appointments/12"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_appointment(12).await.unwrap();
    }

    #[tokio::test]
    async fn missing_appointment_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appointments/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_appointment(404).await.unwrap_err();
        assert!(matches!(err, CourierError::Status { status: 404, .. }));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let config = ApiConfig {
            base_url: "  ".to_string(),
            timeout_secs: 5,
        };
        assert!(matches!(
            HttpApiClient::new(&config, Session::anonymous()),
            Err(CourierError::Config(_))
        ));
    }
}
