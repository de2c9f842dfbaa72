pub mod channel;
pub mod inbox;

pub use channel::NotificationChannel;
pub use inbox::NotificationInbox;
