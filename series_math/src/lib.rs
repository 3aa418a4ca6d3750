//! # Series Math
//!
//! Numerical building blocks for univariate time series forecasting.
//! This crate provides the estimation machinery the forecasting adapters
//! wrap: differencing, simplex optimization, least squares, seasonal
//! ARIMA estimation by conditional sum of squares, a piecewise-linear
//! trend plus Fourier seasonality regressor, and residual diagnostics.

use thiserror::Error;

pub mod arima;
pub mod diagnostics;
pub mod differencing;
pub mod optimization;
pub mod regression;
pub mod seasonality;
pub mod stationarity;
pub mod stats;
pub mod trend_seasonal;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Optimizer failed to converge: {0}")]
    ConvergenceFailure(String),

    /// A stop predicate ended the calculation
    #[error("Calculation interrupted: {0}")]
    Interrupted(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
