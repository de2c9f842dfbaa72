pub mod feed;
pub mod poller;
pub mod tracker;
pub mod window;

pub use feed::AppointmentFeed;
pub use poller::{Clock, ReminderPoller, SystemClock};
pub use tracker::{Reminder, ReminderTracker};
pub use window::{ReminderKind, ReminderWindows};
