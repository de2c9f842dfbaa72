pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod pubsub;
pub mod session;
pub mod types;

pub use api::{ApiClient, HttpApiClient};
pub use config::Config;
pub use context::CourierContext;
pub use error::{CourierError, CourierResult};
pub use pubsub::{ChannelIdentifier, PubSub, Subscription, CONVERSATIONS_CHANNEL, NOTIFICATIONS_CHANNEL};
pub use session::Session;
