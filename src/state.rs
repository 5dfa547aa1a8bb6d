use std::sync::Arc;

use crate::ai::AiLegalService;
use crate::chat::ChatConnections;
use crate::config::AppConfig;
use crate::email::Mailer;
use crate::metrics::MetricsCollector;
use crate::storage::Storage;

/// Shared application state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub mailer: Mailer,
    pub ai: AiLegalService,
    pub metrics: Arc<MetricsCollector>,
    pub connections: ChatConnections,
}

impl AppState {
    pub fn new(config: &AppConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            mailer: Mailer::new(config.email.clone()),
            ai: AiLegalService::new(config.ai.clone()),
            metrics: Arc::new(MetricsCollector::new()),
            connections: ChatConnections::default(),
        }
    }
}
