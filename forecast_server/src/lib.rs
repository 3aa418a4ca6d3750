//! # Forecast Server
//!
//! HTTP API over `forecast_core`: load a series from samples, market data
//! or CSV uploads, then run ARIMA, SARIMA, the additive trend model or a
//! comparison of all three.
//!
//! Fitting is CPU-bound and runs on the blocking pool; handlers only
//! validate, dispatch and serialize.

pub mod config;
pub mod error;
pub mod market;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Largest accepted request body, CSV uploads included
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the application router
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/docs", get(routes::docs))
        .route("/api/load_sample_data", get(routes::load_sample_data))
        .route("/api/load_stock_data", post(routes::load_stock_data))
        .route("/api/load_csv_data", post(routes::load_csv_data))
        .route("/api/series", get(routes::current_series))
        .route("/api/forecast", post(routes::forecast))
        .route("/api/decompose", post(routes::decompose))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
