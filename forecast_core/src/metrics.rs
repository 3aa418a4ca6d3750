//! In-sample accuracy metrics for fitted models

use crate::error::{ForecastError, Result};
use serde::Serialize;
use series_math::stats;

/// Accuracy of a model's fitted values against the training data
///
/// Information criteria are `None` for models without a likelihood and
/// serialize as `null`. MAPE is `None` when every actual value is zero,
/// and R² when the actuals have no variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub r2: Option<f64>,
}

impl Metrics {
    /// Compute the error metrics for `fitted` against `actual`
    pub fn in_sample(actual: &[f64], fitted: &[f64], aic: Option<f64>, bic: Option<f64>) -> Result<Self> {
        check_lengths(actual, fitted)?;
        Ok(Self {
            rmse: rmse(actual, fitted)?,
            mae: mae(actual, fitted)?,
            mape: mape(actual, fitted)?,
            aic: aic.filter(|v| v.is_finite()),
            bic: bic.filter(|v| v.is_finite()),
            r2: r2(actual, fitted)?,
        })
    }
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::Data(format!(
            "Actual ({}) and predicted ({}) values must have the same non-zero length",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok((sse / actual.len() as f64).sqrt())
}

/// Mean absolute error
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    Ok(sum / actual.len() as f64)
}

/// Mean absolute percentage error in percent, skipping zero actuals
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<Option<f64>> {
    check_lengths(actual, predicted)?;
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| a.abs() > f64::EPSILON)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if terms.is_empty() {
        return Ok(None);
    }
    Ok(Some(100.0 * terms.iter().sum::<f64>() / terms.len() as f64))
}

/// Coefficient of determination
pub fn r2(actual: &[f64], predicted: &[f64]) -> Result<Option<f64>> {
    check_lengths(actual, predicted)?;
    let mean = stats::mean(actual);
    let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if total <= f64::EPSILON {
        return Ok(None);
    }
    let residual: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(Some(1.0 - residual / total))
}
