//! Additive trend/seasonality/holiday adapter
//!
//! Fits a piecewise-linear trend with Fourier seasonal blocks and holiday
//! indicators. Seasonalities left unset in [`AdditiveParams`] are switched
//! on when the history is long enough to observe them and the sampling is
//! fine enough to resolve them. Intervals come from the residual spread.

use super::{ensure_family, ensure_min_length, CancelToken, Diagnostics, FitParts, ForecastResult, IntervalMethod, ModelAdapter};
use crate::config::{AdditiveParams, ModelConfig, ModelKind, ModelParams};
use crate::error::{ForecastError, Result};
use crate::series::Series;
use series_math::diagnostics::summarize_residuals;
use series_math::stats;
use series_math::trend_seasonal::{Holiday, Seasonality, TrendSeasonalConfig, TrendSeasonalFit};

/// Additive decomposition model with residual-based intervals
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveAdapter;

impl ModelAdapter for AdditiveAdapter {
    fn kind(&self) -> ModelKind {
        ModelKind::Prophet
    }

    fn fit_and_forecast(&self, series: &Series, config: &ModelConfig, cancel: &CancelToken) -> Result<ForecastResult> {
        ensure_family(ModelKind::Prophet, config)?;
        config.validate()?;
        ensure_min_length(ModelKind::Prophet, series)?;
        cancel.check(ModelKind::Prophet)?;
        let ModelParams::Additive(params) = &config.params else {
            return Err(ForecastError::InvalidConfig(
                "Additive parameters are required for prophet".to_string(),
            ));
        };

        let t_days = series.day_offsets();
        let settings = resolve_settings(series, params);
        let components: Vec<String> = settings
            .seasonalities
            .iter()
            .map(|s| s.name.clone())
            .chain(settings.holidays.iter().map(|h| format!("holiday:{}", h.name)))
            .collect();
        tracing::debug!(components = ?components, "fitting additive model");

        let outcome = TrendSeasonalFit::fit_until(&t_days, series.values(), settings, || cancel.is_cancelled());
        cancel.check(ModelKind::Prophet)?;
        let fit = outcome?;

        let future_days = series.offsets_of(&series.future_timestamps(config.horizon));
        let values = fit.predict(&future_days);
        let spread = stats::std_dev(&fit.residuals);
        let spread = if spread.is_finite() { spread } else { 0.0 };
        let half_width = stats::normal_critical_value(config.confidence)? * spread;

        let description = format!(
            "Additive trend ({} changepoints){}",
            fit.changepoint_days().len(),
            if components.is_empty() {
                String::new()
            } else {
                format!(" + {}", components.join(" + "))
            }
        );
        let parts = FitParts {
            description,
            lower: values.iter().map(|v| v - half_width).collect(),
            upper: values.iter().map(|v| v + half_width).collect(),
            values,
            diagnostics: Diagnostics {
                residuals: summarize_residuals(&fit.residuals, 0),
                log_likelihood: None,
                sigma2: Some(spread * spread),
                seasonal_period: None,
                candidates_evaluated: 1,
                candidates_failed: 0,
                components,
            },
            fitted: fit.fitted,
            residuals: fit.residuals,
            aic: None,
            bic: None,
            interval_method: IntervalMethod::ResidualFallback,
        };
        ForecastResult::assemble(ModelKind::Prophet, series, parts)
    }
}

/// Translate request settings into model settings for this series
fn resolve_settings(series: &Series, params: &AdditiveParams) -> TrendSeasonalConfig {
    let span_days = series.day_offsets().last().copied().unwrap_or(0.0);
    let spacing = series.frequency().nominal_days();

    let yearly = params.yearly_seasonality.unwrap_or(span_days >= 730.0);
    let weekly = params
        .weekly_seasonality
        .unwrap_or(span_days >= 14.0 && spacing < 7.0);
    let daily = params
        .daily_seasonality
        .unwrap_or(span_days >= 2.0 && spacing < 1.0);

    let seasonalities = [
        (yearly, Seasonality::yearly()),
        (weekly, Seasonality::weekly()),
        (daily, Seasonality::daily()),
    ]
    .into_iter()
    .filter_map(|(enabled, seasonality)| enabled.then_some(seasonality))
    .collect();

    let origin = series.origin().date();
    let holidays = params
        .holidays
        .iter()
        .map(|h| Holiday {
            name: h.name.clone(),
            days: h.dates.iter().map(|d| (*d - origin).num_days()).collect(),
            lower_window: h.lower_window,
            upper_window: h.upper_window,
        })
        .collect();

    TrendSeasonalConfig {
        n_changepoints: params.n_changepoints,
        changepoint_range: params.changepoint_range,
        changepoint_prior_scale: params.changepoint_prior_scale,
        seasonality_prior_scale: params.seasonality_prior_scale,
        holidays_prior_scale: params.holidays_prior_scale,
        seasonalities,
        holidays,
    }
}
