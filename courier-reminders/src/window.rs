use chrono::{DateTime, Duration, Utc};
use courier_core::config::ReminderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderKind {
    Upcoming,
    Starting,
}

/// Time windows around an appointment start in which reminders fire.
///
/// `Upcoming` covers `[start - upcoming, start)`, `Starting` covers
/// `[start, start + starting)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindows {
    upcoming: Duration,
    starting: Duration,
}

impl Default for ReminderWindows {
    fn default() -> Self {
        Self::from(&ReminderConfig::default())
    }
}

impl From<&ReminderConfig> for ReminderWindows {
    fn from(config: &ReminderConfig) -> Self {
        Self::new(
            Duration::minutes(config.upcoming_minutes.max(0)),
            Duration::minutes(config.starting_minutes.max(0)),
        )
    }
}

impl ReminderWindows {
    pub fn new(upcoming: Duration, starting: Duration) -> Self {
        Self { upcoming, starting }
    }

    pub fn classify(&self, now: DateTime<Utc>, scheduled_at: DateTime<Utc>) -> Option<ReminderKind> {
        if now >= scheduled_at - self.upcoming && now < scheduled_at {
            Some(ReminderKind::Upcoming)
        } else if now >= scheduled_at && now < scheduled_at + self.starting {
            Some(ReminderKind::Starting)
        } else {
            None
        }
    }

    /// Instant at which the window for `kind` opens.
    pub fn opens_at(&self, kind: ReminderKind, scheduled_at: DateTime<Utc>) -> DateTime<Utc> {
        match kind {
            ReminderKind::Upcoming => scheduled_at - self.upcoming,
            ReminderKind::Starting => scheduled_at,
        }
    }
}
