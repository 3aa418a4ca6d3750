//! Exploratory analysis of a loaded series

use crate::config::{MAX_SEASONAL_PERIOD, MIN_SEASONAL_PERIOD};
use crate::error::{ForecastError, Result};
use crate::series::Series;
use serde::Serialize;
use series_math::seasonality::decompose_additive;
use series_math::MathError;

/// Additive decomposition aligned with the series dates
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionReport {
    pub label: String,
    pub period: usize,
    pub dates: Vec<String>,
    pub observed: Vec<f64>,
    /// `None` where the centered window does not fit
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<Option<f64>>,
    pub seasonal_indices: Vec<f64>,
    /// 0 for no seasonality, 1 for a purely seasonal series
    pub strength: f64,
}

/// Decompose `series` into trend, seasonal and remainder parts.
///
/// Without an explicit `period` the frequency's natural cycle is used.
pub fn decompose(series: &Series, period: Option<usize>) -> Result<DecompositionReport> {
    let period = match period.or_else(|| series.frequency().default_seasonal_period()) {
        Some(period) => period,
        None => {
            return Err(ForecastError::InvalidConfig(format!(
                "No natural period for {} data; pass one explicitly",
                series.frequency()
            )))
        }
    };
    if !(MIN_SEASONAL_PERIOD..=MAX_SEASONAL_PERIOD).contains(&period) {
        return Err(ForecastError::InvalidConfig(format!(
            "period must be between {} and {}, got {}",
            MIN_SEASONAL_PERIOD, MAX_SEASONAL_PERIOD, period
        )));
    }

    let parts = decompose_additive(series.values(), period).map_err(|err| match err {
        MathError::InsufficientData(msg) => ForecastError::Data(msg),
        other => ForecastError::from(other),
    })?;

    Ok(DecompositionReport {
        label: series.label().to_string(),
        period: parts.period,
        dates: series.date_strings(),
        observed: series.values().to_vec(),
        trend: parts.trend,
        seasonal: parts.seasonal,
        remainder: parts.remainder,
        seasonal_indices: parts.seasonal_indices,
        strength: parts.strength,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{generate_sample, SampleKind, DEFAULT_SEED};

    #[test]
    fn test_monthly_sample_uses_twelve() {
        let series = generate_sample(SampleKind::Economic, DEFAULT_SEED).unwrap();
        let report = decompose(&series, None).unwrap();
        assert_eq!(report.period, 12);
        assert_eq!(report.seasonal_indices.len(), 12);
        assert_eq!(report.trend.len(), series.len());
        assert!(report.trend[0].is_none());
    }

    #[test]
    fn test_period_bounds_and_length() {
        let series = generate_sample(SampleKind::Economic, DEFAULT_SEED).unwrap();
        assert!(matches!(decompose(&series, Some(1)), Err(ForecastError::InvalidConfig(_))));
        let short = series.tail(20);
        assert!(matches!(decompose(&short, Some(12)), Err(ForecastError::Data(_))));
    }
}
