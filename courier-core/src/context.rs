use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::pubsub::PubSub;
use crate::session::Session;

/// Everything a channel or scheduler needs, passed explicitly.
#[derive(Clone)]
pub struct CourierContext {
    pub config: Arc<Config>,
    pub session: Session,
    pub api: Arc<dyn ApiClient>,
    pub realtime: Arc<dyn PubSub>,
}

impl CourierContext {
    pub fn new(
        config: Config,
        session: Session,
        api: Arc<dyn ApiClient>,
        realtime: Arc<dyn PubSub>,
    ) -> Self {
        CourierContext {
            config: Arc::new(config),
            session,
            api,
            realtime,
        }
    }
}
