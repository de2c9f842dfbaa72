use std::sync::Arc;
use std::time::Duration;

use courier_core::types::Appointment;
use courier_core::ApiClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing;

/// Keeps the appointment list fresh by polling the API.
///
/// Consumers read the latest list through a watch receiver. A failed fetch
/// keeps the previous list.
pub struct AppointmentFeed {
    api: Arc<dyn ApiClient>,
    interval: Duration,
    tx: watch::Sender<Vec<Appointment>>,
}

impl AppointmentFeed {
    pub fn new(api: Arc<dyn ApiClient>, interval: Duration) -> (Self, watch::Receiver<Vec<Appointment>>) {
        let (tx, rx) = watch::channel(Vec::new());
        (Self { api, interval, tx }, rx)
    }

    /// Fetch once and publish the result. Returns false when the fetch failed.
    pub async fn refresh(&self) -> bool {
        match self.api.list_appointments().await {
            Ok(appointments) => {
                tracing::debug!("Fetched {} appointments", appointments.len());
                self.tx.send_replace(appointments);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to fetch appointments, keeping previous list: {}", e);
                false
            }
        }
    }

    pub async fn run(self) {
        tracing::info!("Starting appointment feed");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::config::ApiConfig;
    use courier_core::{HttpApiClient, Session};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> Arc<dyn ApiClient> {
        let config = ApiConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        };
        Arc::new(HttpApiClient::new(&config, Session::new("token", Some(1))).unwrap())
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "scheduledAt": "2026-10-17T14:00:00Z", "purpose": "Dock inspection" }
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/appointments"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (feed, rx) = AppointmentFeed::new(api_for(&server), Duration::from_secs(60));

        assert!(feed.refresh().await);
        assert_eq!(rx.borrow().len(), 1);

        assert!(!feed.refresh().await);
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].purpose, "Dock inspection");
    }
}
