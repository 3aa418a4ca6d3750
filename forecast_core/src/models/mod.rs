//! Model adapters and the forecast result they produce

use crate::config::{ModelConfig, ModelKind};
use crate::error::{ForecastError, Result};
use crate::metrics::Metrics;
use crate::series::{format_timestamps, Series, MIN_OBSERVATIONS};
use chrono::NaiveDateTime;
use serde::Serialize;
use series_math::arima::{SarimaFit, SarimaSpec};
use series_math::diagnostics::{summarize_residuals, ResidualSummary};
use series_math::stats;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod additive;
pub mod arima;
pub mod sarima;

pub use additive::AdditiveAdapter;
pub use arima::ArimaAdapter;
pub use sarima::SarimaAdapter;

/// Tolerance when checking that bounds enclose the point forecast
const BOUND_TOLERANCE: f64 = 1e-9;

/// A model family that can fit a series and forecast it
///
/// Adapters are stateless; every call fits from scratch on the series it
/// is given. Long searches poll `cancel` between candidates.
pub trait ModelAdapter: Debug + Send + Sync {
    /// The family this adapter implements
    fn kind(&self) -> ModelKind;

    /// Fit `series` under `config` and forecast `config.horizon` steps
    fn fit_and_forecast(&self, series: &Series, config: &ModelConfig, cancel: &CancelToken) -> Result<ForecastResult>;
}

/// The built-in adapter for `kind`
pub fn adapter_for(kind: ModelKind) -> Arc<dyn ModelAdapter> {
    match kind {
        ModelKind::Arima => Arc::new(ArimaAdapter),
        ModelKind::Sarima => Arc::new(SarimaAdapter),
        ModelKind::Prophet => Arc::new(AdditiveAdapter),
    }
}

/// Cooperative cancellation shared between a caller and a running fit
///
/// Set explicitly with [`CancelToken::cancel`], or implicitly once the
/// optional deadline passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    budget: Option<Duration>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only trips when cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips `budget` from now
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            budget: Some(budget),
            deadline: Instant::now().checked_add(budget),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// `Err(Timeout)` once the token has tripped
    pub fn check(&self, kind: ModelKind) -> Result<()> {
        if self.is_cancelled() {
            return Err(ForecastError::Timeout {
                model: kind.to_string(),
                budget: self.budget.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// How prediction intervals were derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// From the fitted model's error variance
    Analytic,
    /// From the spread of in-sample residuals
    ResidualFallback,
    /// Naive bands around a placeholder forecast
    Placeholder,
}

/// Future dates with point forecasts and interval bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPath {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
}

/// The snapshot a model was fitted on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingWindow {
    pub label: String,
    pub observations: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TrainingWindow {
    pub fn of(series: &Series) -> Self {
        Self {
            label: series.label().to_string(),
            observations: series.len(),
            start: series.timestamps()[0],
            end: series.last_timestamp(),
        }
    }
}

/// Model-specific fit details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub residuals: ResidualSummary,
    pub log_likelihood: Option<f64>,
    pub sigma2: Option<f64>,
    pub seasonal_period: Option<usize>,
    /// Orders tried by the automatic search; 1 in manual mode
    pub candidates_evaluated: usize,
    pub candidates_failed: usize,
    /// Seasonalities and holidays of the additive model
    pub components: Vec<String>,
}

/// Output of one adapter run
///
/// Every forecast vector has one entry per horizon step, every in-sample
/// vector one per training observation, and the bounds enclose the point
/// forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub model: ModelKind,
    pub description: String,
    pub forecast: ForecastPath,
    pub fitted_values: Vec<f64>,
    pub residuals: Vec<f64>,
    pub metrics: Metrics,
    pub interval_method: IntervalMethod,
    pub diagnostics: Diagnostics,
    pub training: TrainingWindow,
    /// Set when the values are a placeholder rather than a fitted model
    pub degraded: bool,
}

/// Raw pieces an adapter hands to [`ForecastResult::assemble`]
#[derive(Debug, Clone)]
pub(crate) struct FitParts {
    pub description: String,
    pub values: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub interval_method: IntervalMethod,
    pub diagnostics: Diagnostics,
}

impl ForecastResult {
    /// Attach dates and metrics to a fit, checking the shape invariants
    pub(crate) fn assemble(model: ModelKind, series: &Series, parts: FitParts) -> Result<Self> {
        let horizon = parts.values.len();
        if parts.lower.len() != horizon || parts.upper.len() != horizon {
            return Err(ForecastError::Fit(format!(
                "{} produced {} values but {}/{} bounds",
                model,
                horizon,
                parts.lower.len(),
                parts.upper.len()
            )));
        }
        if parts.fitted.len() != series.len() || parts.residuals.len() != series.len() {
            return Err(ForecastError::Fit(format!(
                "{} produced {} fitted values for {} observations",
                model,
                parts.fitted.len(),
                series.len()
            )));
        }
        let finite = |v: &[f64]| v.iter().all(|x| x.is_finite());
        if !finite(&parts.values) || !finite(&parts.lower) || !finite(&parts.upper) {
            return Err(ForecastError::Fit(format!("{} forecast is not finite", model)));
        }
        for step in 0..horizon {
            let (lo, mid, hi) = (parts.lower[step], parts.values[step], parts.upper[step]);
            if lo > mid + BOUND_TOLERANCE || mid > hi + BOUND_TOLERANCE {
                return Err(ForecastError::Fit(format!(
                    "{} bounds do not enclose the forecast at step {}",
                    model,
                    step + 1
                )));
            }
        }

        let metrics = Metrics::in_sample(series.values(), &parts.fitted, parts.aic, parts.bic)?;
        let dates = format_timestamps(&series.future_timestamps(horizon));
        Ok(Self {
            model,
            description: parts.description,
            forecast: ForecastPath {
                dates,
                values: parts.values,
                lower_bound: parts.lower,
                upper_bound: parts.upper,
            },
            fitted_values: parts.fitted,
            residuals: parts.residuals,
            metrics,
            interval_method: parts.interval_method,
            diagnostics: parts.diagnostics,
            training: TrainingWindow::of(series),
            degraded: false,
        })
    }

    /// A naive last-value forecast flagged as degraded.
    ///
    /// Bands widen with the square root of the step, scaled by the spread
    /// of first differences.
    pub fn placeholder(model: ModelKind, series: &Series, horizon: usize, confidence: f64) -> Result<Self> {
        let values = series.values();
        let last = values[values.len() - 1];
        let steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let spread = if steps.len() >= 2 {
            stats::std_dev(&steps)
        } else {
            0.0
        };
        let z = stats::normal_critical_value(confidence)?;

        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(values[0]);
        fitted.extend_from_slice(&values[..values.len() - 1]);
        let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(a, f)| a - f).collect();

        let half_widths: Vec<f64> = (1..=horizon)
            .map(|h| z * spread * (h as f64).sqrt())
            .collect();
        let parts = FitParts {
            description: "Naive placeholder".to_string(),
            values: vec![last; horizon],
            lower: half_widths.iter().map(|w| last - w).collect(),
            upper: half_widths.iter().map(|w| last + w).collect(),
            diagnostics: Diagnostics {
                residuals: summarize_residuals(&residuals, 0),
                log_likelihood: None,
                sigma2: None,
                seasonal_period: None,
                candidates_evaluated: 0,
                candidates_failed: 0,
                components: Vec::new(),
            },
            fitted,
            residuals,
            aic: None,
            bic: None,
            interval_method: IntervalMethod::Placeholder,
        };
        let mut result = Self::assemble(model, series, parts)?;
        result.degraded = true;
        Ok(result)
    }

    /// Number of forecast steps
    pub fn horizon(&self) -> usize {
        self.forecast.values.len()
    }
}

/// Fail with a fit error when `series` is too short for any model
pub(crate) fn ensure_min_length(kind: ModelKind, series: &Series) -> Result<()> {
    if series.len() < MIN_OBSERVATIONS {
        return Err(ForecastError::Fit(format!(
            "{} needs at least {} observations, got {}",
            kind,
            MIN_OBSERVATIONS,
            series.len()
        )));
    }
    Ok(())
}

/// Fail with an invalid-config error when `config` is for another family
pub(crate) fn ensure_family(kind: ModelKind, config: &ModelConfig) -> Result<()> {
    if config.kind() != kind {
        return Err(ForecastError::InvalidConfig(format!(
            "{} adapter received {} parameters",
            kind,
            config.kind()
        )));
    }
    Ok(())
}

/// Fit a single `spec`, polling `cancel` inside the optimizer.
///
/// A fit that outlives the token is reported as a timeout, never as a result.
pub(crate) fn fit_cancellable(
    kind: ModelKind,
    values: &[f64],
    spec: SarimaSpec,
    cancel: &CancelToken,
) -> Result<SarimaFit> {
    cancel.check(kind)?;
    let outcome = SarimaFit::fit_until(values, spec, || cancel.is_cancelled());
    cancel.check(kind)?;
    Ok(outcome?)
}

/// Outcome of an order search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SearchStats {
    pub evaluated: usize,
    pub failed: usize,
}

/// Fit every candidate and keep the lowest AIC.
///
/// Candidates that fail to estimate are skipped. The token is checked
/// before each candidate and polled inside the optimizer.
pub(crate) fn select_by_aic(
    kind: ModelKind,
    values: &[f64],
    candidates: &[SarimaSpec],
    cancel: &CancelToken,
) -> Result<(SarimaFit, SearchStats)> {
    let mut best: Option<SarimaFit> = None;
    let mut stats = SearchStats::default();
    let mut last_error = None;

    for spec in candidates {
        cancel.check(kind)?;
        stats.evaluated += 1;
        if values.len() < spec.min_observations() {
            stats.failed += 1;
            continue;
        }
        let outcome = SarimaFit::fit_until(values, *spec, || cancel.is_cancelled());
        cancel.check(kind)?;
        match outcome {
            Ok(fit) if fit.aic.is_finite() => {
                tracing::debug!(model = %kind, spec = %spec, aic = fit.aic, "candidate fitted");
                if best.as_ref().map_or(true, |b| fit.aic < b.aic) {
                    best = Some(fit);
                }
            }
            Ok(fit) => {
                stats.failed += 1;
                tracing::debug!(model = %kind, spec = %spec, aic = fit.aic, "candidate has no finite AIC");
            }
            Err(err) => {
                stats.failed += 1;
                tracing::debug!(model = %kind, spec = %spec, error = %err, "candidate failed");
                last_error = Some(err);
            }
        }
    }

    match best {
        Some(fit) => {
            tracing::info!(
                model = %kind,
                selected = %fit.spec,
                aic = fit.aic,
                evaluated = stats.evaluated,
                failed = stats.failed,
                "order search finished"
            );
            Ok((fit, stats))
        }
        None => Err(ForecastError::Fit(match last_error {
            Some(err) => format!("No candidate order could be estimated: {}", err),
            None => format!(
                "No candidate order could be estimated on {} observations",
                values.len()
            ),
        })),
    }
}

/// Forecast from a fitted (S)ARIMA model and package the result
pub(crate) fn sarima_result(
    kind: ModelKind,
    series: &Series,
    fit: &SarimaFit,
    config: &ModelConfig,
    stats: SearchStats,
) -> Result<ForecastResult> {
    let forecast = fit.forecast(config.horizon, config.confidence)?;
    let parts = FitParts {
        description: fit.spec.to_string(),
        values: forecast.mean,
        lower: forecast.lower,
        upper: forecast.upper,
        fitted: fit.fitted.clone(),
        residuals: fit.residuals.clone(),
        aic: Some(fit.aic),
        bic: Some(fit.bic),
        interval_method: IntervalMethod::Analytic,
        diagnostics: Diagnostics {
            residuals: summarize_residuals(&fit.residuals, fit.spec.num_params()),
            log_likelihood: Some(fit.log_likelihood),
            sigma2: Some(fit.sigma2),
            seasonal_period: fit.spec.is_seasonal().then_some(fit.spec.period),
            candidates_evaluated: stats.evaluated,
            candidates_failed: stats.failed,
            components: Vec::new(),
        },
    };
    ForecastResult::assemble(kind, series, parts)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::series::Series;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    /// Daily series starting 2023-01-01 with values from `f(i)` plus seeded noise
    pub fn daily_series(n: usize, seed: u64, noise: f64, f: impl Fn(usize) -> f64) -> Series {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, noise).unwrap();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let values = (0..n).map(|i| f(i) + normal.sample(&mut rng)).collect();
        Series::new("TEST", timestamps, values).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::daily_series;
    use super::*;

    #[test]
    fn test_cancel_token_trips() {
        let token = CancelToken::new();
        assert!(token.check(ModelKind::Arima).is_ok());
        let shared = token.clone();
        shared.cancel();
        assert!(matches!(
            token.check(ModelKind::Arima),
            Err(ForecastError::Timeout { .. })
        ));

        let expired = CancelToken::with_budget(Duration::ZERO);
        assert!(expired.is_cancelled());
    }

    #[test]
    fn test_placeholder_is_degraded_and_ordered() {
        let series = daily_series(30, 3, 1.0, |i| i as f64);
        let result = ForecastResult::placeholder(ModelKind::Arima, &series, 5, 0.9).unwrap();
        assert!(result.degraded);
        assert_eq!(result.interval_method, IntervalMethod::Placeholder);
        assert_eq!(result.horizon(), 5);
        assert_eq!(result.forecast.dates.len(), 5);
        assert_eq!(result.fitted_values.len(), 30);
        for step in 0..5 {
            assert!(result.forecast.lower_bound[step] <= result.forecast.values[step]);
            assert!(result.forecast.values[step] <= result.forecast.upper_bound[step]);
        }
        // Bands widen with the horizon
        let width = |i: usize| result.forecast.upper_bound[i] - result.forecast.lower_bound[i];
        assert!(width(4) > width(0));
    }

    #[test]
    fn test_assemble_rejects_crossed_bounds() {
        let series = daily_series(12, 1, 1.0, |_| 5.0);
        let parts = FitParts {
            description: "broken".to_string(),
            values: vec![1.0],
            lower: vec![2.0],
            upper: vec![3.0],
            fitted: series.values().to_vec(),
            residuals: vec![0.0; 12],
            aic: None,
            bic: None,
            interval_method: IntervalMethod::Analytic,
            diagnostics: Diagnostics {
                residuals: summarize_residuals(&[0.0; 12], 0),
                log_likelihood: None,
                sigma2: None,
                seasonal_period: None,
                candidates_evaluated: 1,
                candidates_failed: 0,
                components: Vec::new(),
            },
        };
        assert!(matches!(
            ForecastResult::assemble(ModelKind::Arima, &series, parts),
            Err(ForecastError::Fit(_))
        ));
    }
}
