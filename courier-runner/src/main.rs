use std::sync::Arc;

use anyhow::Result;
use courier_core::types::SoundCategory;
use courier_core::{Config, CourierContext, HttpApiClient, PubSub, Session};
use courier_delivery::{player_from_config, OneShotAudio, SoundFlag, TracingToasts};
use courier_messaging::ConversationChannel;
use courier_notify::NotificationChannel;
use courier_realtime::{CableClient, LocalHub};
use courier_reminders::{AppointmentFeed, ReminderPoller};
use tokio;
use tracing;
use tracing_subscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Courier realtime client");

    // Load configuration
    let config = Config::from_env();
    let session = Session::from_config(&config.session);
    if !session.is_authenticated() {
        tracing::warn!("AUTH_TOKEN is not set, requests will be anonymous");
    }

    let api = Arc::new(HttpApiClient::new(&config.api, session.clone())?);
    let cable = match CableClient::connect(&config.realtime, &session).await {
        Ok(cable) => {
            tracing::info!("Connected to {}", config.realtime.cable_url);
            Some(Arc::new(cable))
        }
        Err(e) => {
            tracing::error!("Realtime connection failed, running without live updates: {}", e);
            None
        }
    };
    let realtime: Arc<dyn PubSub> = match &cable {
        Some(cable) => cable.clone(),
        None => Arc::new(LocalHub::new()),
    };

    let ctx = CourierContext::new(config, session, api, realtime);
    let sounds = player_from_config(&ctx.config.sounds);

    let notifications = NotificationChannel::open(&ctx, sounds.clone());

    let conversation = match ctx.config.session.conversation_id {
        Some(conversation_id) => Some(ConversationChannel::open(&ctx, conversation_id, sounds.clone())),
        None => None,
    };

    // Reminders: feed -> poller -> one-shot audio
    let (feed, appointments) = AppointmentFeed::new(ctx.api.clone(), ctx.config.reminders.scan_interval());
    let feed_task = feed.spawn();

    let alarm = SoundFlag::new();
    let audio_task = OneShotAudio::new(alarm.clone(), sounds, SoundCategory::Appointment).spawn();
    let poller_task = ReminderPoller::new(&ctx.config.reminders, appointments, Arc::new(TracingToasts), alarm).spawn();

    tracing::info!("Courier client running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    poller_task.abort();
    audio_task.abort();
    feed_task.abort();

    if let Some(conversation) = conversation {
        conversation.close().await;
    }
    tracing::info!(
        "Closing with {} unread notifications",
        notifications.unread_count().await
    );
    notifications.close().await;
    if let Some(cable) = cable {
        cable.close();
    }

    Ok(())
}
