use std::collections::HashSet;

use chrono::{DateTime, Utc};
use courier_core::types::{Appointment, AppointmentId, NotificationCategory, NotificationType};
use courier_delivery::Toast;

use crate::window::{ReminderKind, ReminderWindows};

/// An alert produced by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub appointment_id: AppointmentId,
    pub kind: ReminderKind,
    pub toast: Toast,
}

/// Remembers which appointments already alerted so each window fires once.
///
/// The sets live in memory only; a fresh tracker re-arms every appointment
/// that is still inside a window.
#[derive(Debug, Clone, Default)]
pub struct ReminderTracker {
    windows: ReminderWindows,
    upcoming_sent: HashSet<AppointmentId>,
    starting_sent: HashSet<AppointmentId>,
}

impl ReminderTracker {
    pub fn new(windows: ReminderWindows) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }

    fn sent(&self, kind: ReminderKind) -> &HashSet<AppointmentId> {
        match kind {
            ReminderKind::Upcoming => &self.upcoming_sent,
            ReminderKind::Starting => &self.starting_sent,
        }
    }

    pub fn has_fired(&self, id: AppointmentId, kind: ReminderKind) -> bool {
        self.sent(kind).contains(&id)
    }

    /// Check every appointment against `now` and return the alerts that have
    /// not fired yet, marking them as fired.
    pub fn scan(&mut self, now: DateTime<Utc>, appointments: &[Appointment]) -> Vec<Reminder> {
        let mut fired = Vec::new();

        for appointment in appointments.iter().filter(|a| a.status.is_active()) {
            let Some(kind) = self.windows.classify(now, appointment.scheduled_at) else {
                continue;
            };

            let inserted = match kind {
                ReminderKind::Upcoming => self.upcoming_sent.insert(appointment.id),
                ReminderKind::Starting => self.starting_sent.insert(appointment.id),
            };
            if !inserted {
                continue;
            }

            tracing::debug!("Appointment {} entered {:?} window", appointment.id, kind);
            fired.push(Reminder {
                appointment_id: appointment.id,
                kind,
                toast: reminder_toast(kind, now, appointment),
            });
        }

        fired
    }

    /// Earliest instant at or after `now` when a scan could fire something.
    /// Returns `now` when an alert is already due and `None` when nothing is
    /// left to fire.
    pub fn next_wake(&self, now: DateTime<Utc>, appointments: &[Appointment]) -> Option<DateTime<Utc>> {
        let mut wake: Option<DateTime<Utc>> = None;

        for appointment in appointments.iter().filter(|a| a.status.is_active()) {
            if let Some(kind) = self.windows.classify(now, appointment.scheduled_at) {
                if !self.has_fired(appointment.id, kind) {
                    return Some(now);
                }
            }

            for kind in [ReminderKind::Upcoming, ReminderKind::Starting] {
                let opens = self.windows.opens_at(kind, appointment.scheduled_at);
                if opens > now && !self.has_fired(appointment.id, kind) {
                    wake = Some(wake.map_or(opens, |w| w.min(opens)));
                }
            }
        }

        wake
    }
}

fn reminder_toast(kind: ReminderKind, now: DateTime<Utc>, appointment: &Appointment) -> Toast {
    match kind {
        ReminderKind::Upcoming => {
            let seconds = (appointment.scheduled_at - now).num_seconds().max(0);
            let minutes = ((seconds + 59) / 60).max(1);
            Toast::new(
                "Upcoming Appointment",
                format!(
                    "Your appointment \"{}\" starts in {} minutes",
                    appointment.purpose, minutes
                ),
                NotificationType::Info,
                NotificationCategory::Appointment,
            )
        }
        ReminderKind::Starting => Toast::new(
            "Appointment Starting",
            format!("Your appointment \"{}\" is starting now", appointment.purpose),
            NotificationType::Warning,
            NotificationCategory::Appointment,
        ),
    }
}
