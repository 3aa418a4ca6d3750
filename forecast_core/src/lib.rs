//! # Forecast Core
//!
//! Univariate time series forecasting with automatic model selection.
//!
//! ## Features
//!
//! - Series loading from CSV (file or bytes) and seeded sample generators
//! - ARIMA, seasonal ARIMA and an additive trend/seasonality/holiday model
//! - Automatic order and period selection with fast and full search grids
//! - Comparison runs that tolerate individual model failures
//! - Per-request wall-clock budgets with cooperative cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_core::loader::{generate_sample, SampleKind, DEFAULT_SEED};
//! use forecast_core::{ForecastOutcome, ForecastRequest, Orchestrator};
//! use std::sync::Arc;
//!
//! let series = Arc::new(generate_sample(SampleKind::Trend, DEFAULT_SEED)?);
//! let plan = ForecastRequest::new("compare").plan()?;
//!
//! let orchestrator = Orchestrator::default();
//! match orchestrator.run(series, plan.selector, &plan.config)? {
//!     ForecastOutcome::Comparison(result) => {
//!         println!("best by RMSE: {:?}", result.comparison.best_by_rmse);
//!     }
//!     ForecastOutcome::Single(result) => println!("{}", result.description),
//! }
//! # Ok::<(), forecast_core::ForecastError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod frequency;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod request;
pub mod series;

// Re-export commonly used types
pub use crate::config::{ModelConfig, ModelKind, ModelParams, ModelSelector, SearchLimits};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::Metrics;
pub use crate::models::{CancelToken, ForecastResult, IntervalMethod, ModelAdapter};
pub use crate::orchestrator::{ComparisonResult, ForecastOutcome, Orchestrator, OrchestratorSettings};
pub use crate::request::{ForecastPlan, ForecastRequest, SeriesPayload};
pub use crate::series::{Series, SeriesRepository};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
