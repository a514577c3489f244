//! Shared gateway state.

use fastci_config::GatewayConfig;
use fastci_scheduler::BuildQueue;
use std::sync::Arc;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub queue: Arc<BuildQueue>,
    /// Client for the provider IP-range endpoints; carries its own
    /// request timeout.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Arc<GatewayConfig>, queue: Arc<BuildQueue>, http: reqwest::Client) -> Self {
        Self {
            config,
            queue,
            http,
        }
    }
}
