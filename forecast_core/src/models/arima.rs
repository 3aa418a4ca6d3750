//! Non-seasonal ARIMA adapter
//!
//! In auto mode the differencing order comes from repeated ADF tests, and
//! the AR and MA orders from an AIC search over the grid allowed by the
//! configured [`SearchLimits`](crate::config::SearchLimits). Fixing `d`
//! before the search keeps the information criteria comparable.

use super::{
    ensure_family, ensure_min_length, fit_cancellable, sarima_result, select_by_aic, CancelToken, ForecastResult,
    ModelAdapter, SearchStats,
};
use crate::config::{ModelConfig, ModelKind, ModelParams, SearchLimits};
use crate::error::{ForecastError, Result};
use crate::series::Series;
use series_math::arima::SarimaSpec;
use series_math::stationarity::suggest_differences;

/// ARIMA(p, d, q) with a manual or searched order
#[derive(Debug, Clone, Copy, Default)]
pub struct ArimaAdapter;

impl ModelAdapter for ArimaAdapter {
    fn kind(&self) -> ModelKind {
        ModelKind::Arima
    }

    fn fit_and_forecast(&self, series: &Series, config: &ModelConfig, cancel: &CancelToken) -> Result<ForecastResult> {
        ensure_family(ModelKind::Arima, config)?;
        config.validate()?;
        ensure_min_length(ModelKind::Arima, series)?;

        let values = series.values();
        let (fit, stats) = if config.auto_params {
            let d = suggest_differences(values, config.limits.max_d);
            let candidates = candidate_orders(d, &config.limits);
            tracing::debug!(d, candidates = candidates.len(), "searching ARIMA orders");
            select_by_aic(ModelKind::Arima, values, &candidates, cancel)?
        } else {
            let ModelParams::Arima { order: Some(order) } = &config.params else {
                return Err(ForecastError::InvalidConfig(
                    "ARIMA order (p, d, q) is required when auto_params is false".to_string(),
                ));
            };
            let spec = SarimaSpec::arima(order.p, order.d, order.q);
            let fit = fit_cancellable(ModelKind::Arima, values, spec, cancel)?;
            let stats = SearchStats {
                evaluated: 1,
                failed: 0,
            };
            (fit, stats)
        };

        sarima_result(ModelKind::Arima, series, &fit, config, stats)
    }
}

/// Orders with `p <= max_p`, `q <= max_q` and `p + d + q <= max_order_sum`
fn candidate_orders(d: usize, limits: &SearchLimits) -> Vec<SarimaSpec> {
    let mut out = Vec::new();
    for p in 0..=limits.max_p {
        for q in 0..=limits.max_q {
            if p + d + q <= limits.max_order_sum.max(d) {
                out.push(SarimaSpec::arima(p, d, q));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArimaOrder;
    use crate::models::test_support::daily_series;
    use crate::models::IntervalMethod;

    #[test]
    fn test_candidate_grid_respects_order_sum() {
        let limits = SearchLimits::fast();
        let grid = candidate_orders(1, &limits);
        assert!(grid.iter().all(|s| s.p + s.d + s.q <= 4 && s.d == 1));
        assert!(grid.contains(&SarimaSpec::arima(0, 1, 0)));
        assert!(!grid.contains(&SarimaSpec::arima(3, 1, 1)));
    }

    #[test]
    fn test_auto_fit_on_trend() {
        let series = daily_series(120, 5, 1.0, |i| 10.0 + 0.5 * i as f64);
        let config = ModelConfig::auto(ModelKind::Arima).with_horizon(7);
        let result = ArimaAdapter
            .fit_and_forecast(&series, &config, &CancelToken::new())
            .unwrap();

        assert_eq!(result.model, ModelKind::Arima);
        assert_eq!(result.interval_method, IntervalMethod::Analytic);
        assert_eq!(result.forecast.values.len(), 7);
        assert_eq!(result.residuals.len(), 120);
        assert!(result.metrics.aic.is_some());
        assert!(result.diagnostics.candidates_evaluated > 1);
        // The trend continues upward past the last observation
        assert!(result.forecast.values[6] > series.values()[100]);
    }

    #[test]
    fn test_manual_order_is_used() {
        let series = daily_series(80, 9, 1.0, |i| (i as f64 / 5.0).sin() * 3.0);
        let config = ModelConfig::manual(ModelParams::Arima {
            order: Some(ArimaOrder { p: 1, d: 0, q: 1 }),
        })
        .with_horizon(3);
        let result = ArimaAdapter
            .fit_and_forecast(&series, &config, &CancelToken::new())
            .unwrap();
        assert_eq!(result.description, "ARIMA(1,0,1)");
        assert_eq!(result.diagnostics.candidates_evaluated, 1);
    }

    #[test]
    fn test_cancelled_search_times_out() {
        let series = daily_series(60, 2, 1.0, |i| i as f64);
        let token = CancelToken::new();
        token.cancel();
        let result = ArimaAdapter.fit_and_forecast(&series, &ModelConfig::auto(ModelKind::Arima), &token);
        assert!(matches!(result, Err(ForecastError::Timeout { .. })));
    }

    #[test]
    fn test_rejects_other_family() {
        let series = daily_series(60, 2, 1.0, |i| i as f64);
        let result = ArimaAdapter.fit_and_forecast(
            &series,
            &ModelConfig::auto(ModelKind::Prophet),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(ForecastError::InvalidConfig(_))));
    }
}
