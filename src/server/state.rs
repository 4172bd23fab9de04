use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::{PushService, ServiceConfig};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub push: Arc<PushService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings, config: ServiceConfig) -> Self {
        Self {
            settings: Arc::new(settings),
            push: Arc::new(PushService::new(config)),
            start_time: Instant::now(),
        }
    }
}
