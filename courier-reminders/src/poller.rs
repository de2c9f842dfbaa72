use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_core::config::ReminderConfig;
use courier_core::types::Appointment;
use courier_delivery::{SoundFlag, ToastSink};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing;

use crate::tracker::ReminderTracker;
use crate::window::ReminderWindows;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Scans the appointment list on a fixed interval and raises alerts.
pub struct ReminderPoller {
    tracker: ReminderTracker,
    appointments: watch::Receiver<Vec<Appointment>>,
    toasts: Arc<dyn ToastSink>,
    sound: SoundFlag,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ReminderPoller {
    pub fn new(
        config: &ReminderConfig,
        appointments: watch::Receiver<Vec<Appointment>>,
        toasts: Arc<dyn ToastSink>,
        sound: SoundFlag,
    ) -> Self {
        Self {
            tracker: ReminderTracker::new(ReminderWindows::from(config)),
            appointments,
            toasts,
            sound,
            clock: Arc::new(SystemClock),
            interval: config.scan_interval(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one scan. Returns how many alerts fired.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let reminders = {
            let appointments = self.appointments.borrow_and_update();
            self.tracker.scan(now, &appointments)
        };

        if reminders.is_empty() {
            return 0;
        }

        let fired = reminders.len();
        for reminder in reminders {
            tracing::info!(
                "Appointment {} reminder: {:?}",
                reminder.appointment_id,
                reminder.kind
            );
            self.toasts.show(reminder.toast);
        }
        self.sound.raise();
        fired
    }

    /// Scan on every interval tick and whenever the appointment list changes.
    pub async fn run(mut self) {
        tracing::info!("Starting reminder poller every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut feed_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.appointments.changed(), if feed_open => {
                    if changed.is_err() {
                        tracing::debug!("Appointment feed closed, scanning on interval only");
                        feed_open = false;
                        continue;
                    }
                    tracing::debug!("Appointment list changed, rescanning");
                }
            }
            self.tick();
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
