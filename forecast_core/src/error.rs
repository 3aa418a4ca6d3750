//! Error types for the forecast_core crate

use polars::prelude::PolarsError;
use series_math::MathError;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading series, validating requests and fitting models
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Parameters out of range, or a configuration that does not match the model
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The model could not be estimated on this series
    #[error("Fit error: {0}")]
    Fit(String),

    /// A fit exceeded its wall-clock budget
    #[error("{model} did not finish within {budget:?}")]
    Timeout { model: String, budget: Duration },

    /// Malformed or unusable series data
    #[error("Data error: {0}")]
    Data(String),

    /// Every model in a comparison failed
    #[error("All models failed: {0}")]
    AllModelsFailed(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

impl ForecastError {
    /// Stable identifier used in failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InvalidConfig(_) => "invalid_config",
            ForecastError::Fit(_) => "fit",
            ForecastError::Timeout { .. } => "timeout",
            ForecastError::Data(_) => "data",
            ForecastError::AllModelsFailed(_) => "all_models_failed",
            ForecastError::Io(_) => "io",
            ForecastError::Polars(_) => "polars",
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

// Numerical failures surface as fit errors; configuration is checked before
// anything reaches the estimation layer.
impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::Fit(err.to_string())
    }
}
