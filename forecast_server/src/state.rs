//! Application state shared across handlers

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::market::MarketClient;
use forecast_core::{Orchestrator, SeriesRepository};
use std::sync::Arc;

/// Shared handles; cloning is cheap
#[derive(Debug, Clone)]
pub struct AppState {
    pub repository: Arc<SeriesRepository>,
    pub orchestrator: Arc<Orchestrator>,
    pub market: MarketClient,
    /// Answer failed single-model forecasts with a degraded placeholder
    pub placeholder_fallback: bool,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> ApiResult<Self> {
        Ok(Self {
            repository: Arc::new(SeriesRepository::new()),
            orchestrator: Arc::new(Orchestrator::new(config.orchestrator_settings())),
            market: MarketClient::new(&config.market_data_url)?,
            placeholder_fallback: config.placeholder_fallback,
        })
    }

    /// Swap the orchestrator, e.g. for one with custom adapters
    pub fn with_orchestrator(mut self, orchestrator: Orchestrator) -> Self {
        self.orchestrator = Arc::new(orchestrator);
        self
    }
}
