//! Piecewise-linear trend with Fourier seasonality and holiday effects
//!
//! The regression is `y(t) = k*t + m + sum delta_j * (t - c_j)+ + X_s beta + X_h kappa`
//! with time scaled to `[0, 1]` over the history and the target scaled by
//! its largest magnitude. Changepoint, seasonal and holiday coefficients
//! carry Gaussian priors, which turns the fit into a ridge regression
//! whose penalties are `sigma^2 / scale^2`. The noise variance `sigma^2`
//! comes from a first pass without changepoints.

use crate::regression::{dot, ridge_solve};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A Fourier seasonality block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    /// Cycle length in days
    pub period_days: f64,
    pub fourier_order: usize,
}

impl Seasonality {
    pub fn new(name: &str, period_days: f64, fourier_order: usize) -> Self {
        Self {
            name: name.to_string(),
            period_days,
            fourier_order,
        }
    }

    pub fn yearly() -> Self {
        Self::new("yearly", 365.25, 10)
    }

    pub fn weekly() -> Self {
        Self::new("weekly", 7.0, 3)
    }

    pub fn daily() -> Self {
        Self::new("daily", 1.0, 4)
    }
}

/// A named set of event days sharing one effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    /// Event days on the same day axis as the observation times
    pub days: Vec<i64>,
    /// Days before the event that share the effect (non-positive)
    pub lower_window: i64,
    /// Days after the event that share the effect (non-negative)
    pub upper_window: i64,
}

/// Model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeasonalConfig {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may sit
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    pub seasonalities: Vec<Seasonality>,
    pub holidays: Vec<Holiday>,
}

impl Default for TrendSeasonalConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            seasonalities: Vec::new(),
            holidays: Vec::new(),
        }
    }
}

/// A fitted trend/seasonality model
#[derive(Debug, Clone)]
pub struct TrendSeasonalFit {
    config: TrendSeasonalConfig,
    t_start: f64,
    t_span: f64,
    y_scale: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Which penalty group a design column belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Base,
    Changepoint,
    Seasonal,
    Holiday,
}

impl TrendSeasonalFit {
    /// Fit on observation times `t_days` (fractional days, increasing) and values `y`.
    pub fn fit(t_days: &[f64], y: &[f64], config: TrendSeasonalConfig) -> Result<Self> {
        Self::fit_until(t_days, y, config, || false)
    }

    /// [`TrendSeasonalFit::fit`], polling `stop` before each regression pass.
    pub fn fit_until<S: Fn() -> bool>(
        t_days: &[f64],
        y: &[f64],
        config: TrendSeasonalConfig,
        stop: S,
    ) -> Result<Self> {
        let n = y.len();
        if t_days.len() != n {
            return Err(MathError::InvalidInput(format!(
                "Got {} times for {} values",
                t_days.len(),
                n
            )));
        }
        if n < 3 {
            return Err(MathError::InsufficientData(format!(
                "Trend model needs at least 3 observations, got {}",
                n
            )));
        }
        validate(&config)?;

        let t_start = t_days[0];
        let t_span = t_days[n - 1] - t_start;
        if !(t_span > 0.0) {
            return Err(MathError::InvalidInput(
                "Observation times must span a positive interval".to_string(),
            ));
        }
        let y_scale = y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let scaled_y: Vec<f64> = y.iter().map(|v| v / y_scale).collect();

        let mut model = Self {
            config,
            t_start,
            t_span,
            y_scale,
            changepoints: Vec::new(),
            coefficients: Vec::new(),
            fitted: Vec::new(),
            residuals: Vec::new(),
        };

        // First pass without changepoints to size the noise
        if stop() {
            return Err(MathError::Interrupted("Trend regression stopped before fitting".to_string()));
        }
        let (design, kinds) = model.design(t_days);
        let mut base_penalties: Vec<f64> = kinds.iter().map(|_| 0.0).collect();
        let beta0 = ridge_solve(&design, &scaled_y, &base_penalties)?;
        let rss0: f64 = design
            .iter()
            .zip(&scaled_y)
            .map(|(row, target)| (target - dot(row, &beta0)).powi(2))
            .sum();
        let sigma2 = (rss0 / n as f64).max(1e-6);
        if stop() {
            return Err(MathError::Interrupted(
                "Trend regression stopped after the noise pass".to_string(),
            ));
        }

        model.changepoints = place_changepoints(
            &model.scaled_times(t_days),
            model.config.n_changepoints,
            model.config.changepoint_range,
        );
        let (design, kinds) = model.design(t_days);
        base_penalties = kinds
            .iter()
            .map(|kind| match kind {
                Column::Base => 0.0,
                Column::Changepoint => sigma2 / model.config.changepoint_prior_scale.powi(2),
                Column::Seasonal => sigma2 / model.config.seasonality_prior_scale.powi(2),
                Column::Holiday => sigma2 / model.config.holidays_prior_scale.powi(2),
            })
            .collect();
        model.coefficients = ridge_solve(&design, &scaled_y, &base_penalties)?;
        if model.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MathError::ConvergenceFailure(
                "Trend regression produced non-finite coefficients".to_string(),
            ));
        }

        model.fitted = design
            .iter()
            .map(|row| dot(row, &model.coefficients) * y_scale)
            .collect();
        model.residuals = y.iter().zip(&model.fitted).map(|(a, f)| a - f).collect();
        Ok(model)
    }

    /// Model values at arbitrary times on the fitting day axis.
    pub fn predict(&self, t_days: &[f64]) -> Vec<f64> {
        let (design, _) = self.design(t_days);
        design
            .iter()
            .map(|row| dot(row, &self.coefficients) * self.y_scale)
            .collect()
    }

    /// Changepoint locations in days on the fitting axis
    pub fn changepoint_days(&self) -> Vec<f64> {
        self.changepoints
            .iter()
            .map(|c| self.t_start + c * self.t_span)
            .collect()
    }

    /// Names of the seasonal blocks in the design
    pub fn seasonality_names(&self) -> Vec<&str> {
        self.config
            .seasonalities
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    fn scaled_times(&self, t_days: &[f64]) -> Vec<f64> {
        t_days
            .iter()
            .map(|t| (t - self.t_start) / self.t_span)
            .collect()
    }

    fn design(&self, t_days: &[f64]) -> (Vec<Vec<f64>>, Vec<Column>) {
        let mut kinds = vec![Column::Base, Column::Base];
        kinds.extend(self.changepoints.iter().map(|_| Column::Changepoint));
        for season in &self.config.seasonalities {
            kinds.extend((0..2 * season.fourier_order).map(|_| Column::Seasonal));
        }
        kinds.extend(self.config.holidays.iter().map(|_| Column::Holiday));

        let rows = t_days
            .iter()
            .zip(self.scaled_times(t_days))
            .map(|(&day, t)| {
                let mut row = Vec::with_capacity(kinds.len());
                row.push(1.0);
                row.push(t);
                row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
                for season in &self.config.seasonalities {
                    for k in 1..=season.fourier_order {
                        let angle = 2.0 * PI * k as f64 * day / season.period_days;
                        row.push(angle.sin());
                        row.push(angle.cos());
                    }
                }
                let whole_day = day.floor() as i64;
                for holiday in &self.config.holidays {
                    let active = holiday.days.iter().any(|&event| {
                        let offset = whole_day - event;
                        offset >= holiday.lower_window && offset <= holiday.upper_window
                    });
                    row.push(if active { 1.0 } else { 0.0 });
                }
                row
            })
            .collect();
        (rows, kinds)
    }
}

fn validate(config: &TrendSeasonalConfig) -> Result<()> {
    if !(config.changepoint_range > 0.0 && config.changepoint_range <= 1.0) {
        return Err(MathError::InvalidInput(format!(
            "changepoint_range must be in (0, 1], got {}",
            config.changepoint_range
        )));
    }
    let scales = [
        config.changepoint_prior_scale,
        config.seasonality_prior_scale,
        config.holidays_prior_scale,
    ];
    if scales.iter().any(|s| !(*s > 0.0 && s.is_finite())) {
        return Err(MathError::InvalidInput(
            "Prior scales must be positive and finite".to_string(),
        ));
    }
    if let Some(season) = config
        .seasonalities
        .iter()
        .find(|s| !(s.period_days > 0.0) || s.fourier_order == 0)
    {
        return Err(MathError::InvalidInput(format!(
            "Seasonality '{}' needs a positive period and order",
            season.name
        )));
    }
    Ok(())
}

/// Evenly spaced changepoints over the first `range` share of the history.
fn place_changepoints(scaled_t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let window = ((scaled_t.len() as f64) * range).floor() as usize;
    if window < 2 || requested == 0 {
        return Vec::new();
    }
    let count = requested.min(window - 1);
    (1..=count)
        .map(|i| {
            let idx = ((i as f64) * (window - 1) as f64 / count as f64).round() as usize;
            scaled_t[idx.min(window - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn days(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_linear_trend_extrapolates() {
        let t = days(100);
        let y: Vec<f64> = t.iter().map(|d| 50.0 + 0.5 * d).collect();
        let fit = TrendSeasonalFit::fit(&t, &y, TrendSeasonalConfig::default()).unwrap();
        let future = fit.predict(&[110.0, 120.0]);
        assert_relative_eq!(future[0], 105.0, epsilon = 0.5);
        assert_relative_eq!(future[1], 110.0, epsilon = 1.0);
        assert_eq!(fit.fitted.len(), 100);
    }

    #[test]
    fn test_weekly_pattern_is_learned() {
        let t = days(140);
        let y: Vec<f64> = t
            .iter()
            .map(|d| 20.0 + 3.0 * (2.0 * PI * d / 7.0).sin())
            .collect();
        let config = TrendSeasonalConfig {
            seasonalities: vec![Seasonality::weekly()],
            ..TrendSeasonalConfig::default()
        };
        let fit = TrendSeasonalFit::fit(&t, &y, config).unwrap();
        let max_residual = fit.residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
        assert!(max_residual < 0.2);
        let next_week = fit.predict(&[141.75]);
        let expected = 20.0 + 3.0 * (2.0 * PI * 141.75 / 7.0).sin();
        assert_relative_eq!(next_week[0], expected, epsilon = 0.3);
        assert_eq!(fit.seasonality_names(), vec!["weekly"]);
    }

    #[test]
    fn test_changepoints_sit_in_range() {
        let t = days(50);
        let y: Vec<f64> = t.iter().map(|d| d.sqrt()).collect();
        let fit = TrendSeasonalFit::fit(&t, &y, TrendSeasonalConfig::default()).unwrap();
        let cps = fit.changepoint_days();
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|c| *c > 0.0 && *c < 40.0));
    }

    #[test]
    fn test_holiday_shift() {
        let t = days(60);
        let y: Vec<f64> = t
            .iter()
            .map(|d| if (*d as i64) == 20 || (*d as i64) == 21 { 15.0 } else { 10.0 })
            .collect();
        let config = TrendSeasonalConfig {
            n_changepoints: 0,
            holidays: vec![Holiday {
                name: "launch".to_string(),
                days: vec![20],
                lower_window: 0,
                upper_window: 1,
            }],
            ..TrendSeasonalConfig::default()
        };
        let fit = TrendSeasonalFit::fit(&t, &y, config).unwrap();
        assert_relative_eq!(fit.fitted[20], 15.0, epsilon = 0.2);
        assert_relative_eq!(fit.fitted[30], 10.0, epsilon = 0.2);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(TrendSeasonalFit::fit(&[0.0, 1.0], &[1.0, 2.0], TrendSeasonalConfig::default()).is_err());
        assert!(TrendSeasonalFit::fit(&[0.0; 5], &[1.0; 5], TrendSeasonalConfig::default()).is_err());
        let bad = TrendSeasonalConfig {
            changepoint_range: 0.0,
            ..TrendSeasonalConfig::default()
        };
        assert!(TrendSeasonalFit::fit(&days(10), &[1.0; 10], bad).is_err());
    }

    #[test]
    fn test_stop_predicate_interrupts_fit() {
        use std::cell::Cell;

        let t = days(60);
        let y: Vec<f64> = t.iter().map(|d| 5.0 + 0.3 * d).collect();
        let err = TrendSeasonalFit::fit_until(&t, &y, TrendSeasonalConfig::default(), || true).unwrap_err();
        assert!(matches!(err, MathError::Interrupted(_)));

        // Stop requested between the two regression passes
        let polls = Cell::new(0);
        let err = TrendSeasonalFit::fit_until(&t, &y, TrendSeasonalConfig::default(), || {
            polls.set(polls.get() + 1);
            polls.get() > 1
        })
        .unwrap_err();
        assert!(matches!(err, MathError::Interrupted(_)));
        assert_eq!(polls.get(), 2);
    }
}
