//! Server configuration from flags and environment

use axum::http::HeaderValue;
use clap::Parser;
use forecast_core::OrchestratorSettings;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Default Yahoo Finance chart endpoint
pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Forecast server settings
///
/// Every flag falls back to an environment variable, which `.env` may set.
#[derive(Debug, Clone, Parser)]
#[command(name = "forecast_server")]
#[command(about = "HTTP API for time series forecasting", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5001)]
    pub port: u16,

    /// Wall-clock budget per forecast request, in seconds
    #[arg(long, env = "FORECAST_BUDGET_SECS", default_value_t = 60)]
    pub budget_secs: u64,

    /// Observations kept when a request asks for fast mode
    #[arg(long, env = "FAST_MODE_WINDOW", default_value_t = 500)]
    pub fast_mode_window: usize,

    /// Answer failed single-model requests with a degraded naive forecast
    #[arg(long, env = "PLACEHOLDER_FALLBACK")]
    pub placeholder_fallback: bool,

    /// Allowed CORS origins, comma separated; any origin when empty
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Chart endpoint used by the stock loader
    #[arg(long, env = "MARKET_DATA_URL", default_value = DEFAULT_MARKET_DATA_URL)]
    pub market_data_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            budget_secs: 60,
            fast_mode_window: 500,
            placeholder_fallback: false,
            cors_origins: Vec::new(),
            market_data_url: DEFAULT_MARKET_DATA_URL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            budget: Duration::from_secs(self.budget_secs),
            fast_mode_window: self.fast_mode_window,
        }
    }

    /// CORS policy; origins that are not valid header values are skipped
    pub fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        if origins.is_empty() {
            layer.allow_origin(Any)
        } else {
            layer.allow_origin(AllowOrigin::list(origins))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "forecast_server",
            "--port",
            "8080",
            "--budget-secs",
            "5",
            "--cors-origins",
            "http://localhost:3000,http://localhost:5173",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.orchestrator_settings().budget, Duration::from_secs(5));
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 5001);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
