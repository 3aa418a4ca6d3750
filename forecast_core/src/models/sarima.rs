//! Seasonal ARIMA adapter
//!
//! Auto mode picks the period first: the frequency's natural cycle and a
//! few common ones are tried, keeping the first whose lag autocorrelation
//! on the differenced series clears [`ACF_SEASONAL_THRESHOLD`]. Seasonal
//! differencing is applied when the seasonal strength is high, regular
//! differencing follows the ADF tests, and the remaining orders are
//! searched by AIC.

use super::{
    ensure_family, ensure_min_length, fit_cancellable, sarima_result, select_by_aic, CancelToken, ForecastResult,
    ModelAdapter, SearchStats,
};
use crate::config::{ModelConfig, ModelKind, ModelParams, SearchLimits};
use crate::error::{ForecastError, Result};
use crate::series::{Series, MIN_OBSERVATIONS};
use series_math::arima::SarimaSpec;
use series_math::differencing::{difference, seasonal_difference};
use series_math::seasonality::{detect_period, seasonal_strength, ACF_SEASONAL_THRESHOLD, STRONG_SEASONALITY};
use series_math::stationarity::suggest_differences;

/// Periods tried after the frequency default
const COMMON_PERIODS: [usize; 5] = [4, 7, 12, 24, 52];

/// Period used for manual orders when neither the request nor the frequency gives one
const FALLBACK_PERIOD: usize = 12;

/// SARIMA(p, d, q)(P, D, Q)[s] with a manual or searched order
#[derive(Debug, Clone, Copy, Default)]
pub struct SarimaAdapter;

impl ModelAdapter for SarimaAdapter {
    fn kind(&self) -> ModelKind {
        ModelKind::Sarima
    }

    fn fit_and_forecast(&self, series: &Series, config: &ModelConfig, cancel: &CancelToken) -> Result<ForecastResult> {
        ensure_family(ModelKind::Sarima, config)?;
        config.validate()?;
        ensure_min_length(ModelKind::Sarima, series)?;

        let values = series.values();
        let (fit, stats) = if config.auto_params {
            let period = choose_period(series)?;
            let candidates = candidate_orders(values, period, &config.limits);
            tracing::debug!(period, candidates = candidates.len(), "searching SARIMA orders");
            select_by_aic(ModelKind::Sarima, values, &candidates, cancel)?
        } else {
            let ModelParams::Sarima {
                order: Some(order),
                seasonal: Some(seasonal),
            } = &config.params
            else {
                return Err(ForecastError::InvalidConfig(
                    "SARIMA orders are required when auto_params is false".to_string(),
                ));
            };
            let period = seasonal
                .period
                .or_else(|| series.frequency().default_seasonal_period())
                .unwrap_or(FALLBACK_PERIOD);
            let spec = SarimaSpec::seasonal(
                (order.p, order.d, order.q),
                (seasonal.p, seasonal.d, seasonal.q),
                period,
            );
            let fit = fit_cancellable(ModelKind::Sarima, values, spec, cancel)?;
            let stats = SearchStats {
                evaluated: 1,
                failed: 0,
            };
            (fit, stats)
        };

        sarima_result(ModelKind::Sarima, series, &fit, config, stats)
    }
}

/// Candidate periods, frequency default first, keeping those with at
/// least two full cycles plus [`MIN_OBSERVATIONS`] of data.
fn feasible_periods(series: &Series) -> Vec<usize> {
    let mut periods: Vec<usize> = Vec::new();
    let preferred = series.frequency().default_seasonal_period();
    for period in preferred.into_iter().chain(COMMON_PERIODS) {
        if !periods.contains(&period) && series.len() >= 2 * period + MIN_OBSERVATIONS {
            periods.push(period);
        }
    }
    periods
}

/// First confirmed candidate period, else the first feasible one
fn choose_period(series: &Series) -> Result<usize> {
    let periods = feasible_periods(series);
    let Some(&first) = periods.first() else {
        return Err(ForecastError::Fit(format!(
            "{} observations are too few for any seasonal period",
            series.len()
        )));
    };
    let differenced = difference(series.values(), 1);
    let detected = detect_period(&differenced, &periods, ACF_SEASONAL_THRESHOLD);
    let period = detected.unwrap_or(first);
    tracing::debug!(period, confirmed = detected.is_some(), "seasonal period chosen");
    Ok(period)
}

/// Seasonal grid for `period` with D and d fixed ahead of the search.
///
/// Orders without any seasonal term are left out.
fn candidate_orders(values: &[f64], period: usize, limits: &SearchLimits) -> Vec<SarimaSpec> {
    let seasonal_d = usize::from(
        limits.max_seasonal_d > 0 && seasonal_strength(values, period) >= STRONG_SEASONALITY,
    );
    let adjusted = if seasonal_d == 1 {
        seasonal_difference(values, 1, period)
    } else {
        values.to_vec()
    };
    let d = suggest_differences(&adjusted, limits.max_d.min(1));

    let mut out = Vec::new();
    for p in 0..=limits.sarima_max_p {
        for q in 0..=limits.sarima_max_q {
            if p + d + q > limits.max_order_sum.max(d) {
                continue;
            }
            for sp in 0..=limits.max_seasonal_p {
                for sq in 0..=limits.max_seasonal_q {
                    let seasonal_terms = sp + seasonal_d + sq;
                    if seasonal_terms == 0 || seasonal_terms > limits.max_seasonal_order_sum {
                        continue;
                    }
                    out.push(SarimaSpec::seasonal((p, d, q), (sp, seasonal_d, sq), period));
                }
            }
        }
    }
    out
}
