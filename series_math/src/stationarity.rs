//! Augmented Dickey-Fuller unit root test

use crate::differencing::difference;
use crate::regression::{least_squares, LeastSquaresFit};
use crate::{MathError, Result};
use serde::Serialize;

/// ADF critical values for the constant-only regression (MacKinnon, asymptotic)
pub const ADF_CRITICAL_1PCT: f64 = -3.43;
pub const ADF_CRITICAL_5PCT: f64 = -2.86;
pub const ADF_CRITICAL_10PCT: f64 = -2.57;

/// Asymptotic quantiles of the Dickey-Fuller t distribution with constant.
const DF_QUANTILES: [(f64, f64); 8] = [
    (-3.43, 0.01),
    (-3.12, 0.025),
    (-2.86, 0.05),
    (-2.57, 0.10),
    (-0.44, 0.90),
    (-0.07, 0.95),
    (0.23, 0.975),
    (0.60, 0.99),
];

/// Outcome of an ADF test
#[derive(Debug, Clone, Serialize)]
pub struct AdfResult {
    /// t statistic of the lagged level coefficient
    pub statistic: f64,
    /// Approximate p-value interpolated from asymptotic quantiles
    pub p_value: f64,
    /// Lagged differences included in the regression
    pub lags: usize,
    /// Observations used by the regression
    pub observations: usize,
    /// Whether the unit root is rejected at 5%
    pub is_stationary: bool,
}

/// Run the ADF regression `dy_t = a + b*y_{t-1} + sum c_i*dy_{t-i}`.
///
/// When `max_lags` is `None` it defaults to `floor((n-1)^(1/3))`. The lag
/// order is picked by AIC over a common estimation sample.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> Result<AdfResult> {
    let n = series.len();
    if n < 8 {
        return Err(MathError::InsufficientData(format!(
            "ADF test needs at least 8 observations, got {}",
            n
        )));
    }

    let default_lags = ((n - 1) as f64).powf(1.0 / 3.0).floor() as usize;
    let max_lags = max_lags.unwrap_or(default_lags).min(n / 2 - 2);

    let diffs = difference(series, 1);
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lags {
        let Ok(fit) = regress(series, &diffs, lag, max_lags) else {
            continue;
        };
        let n_obs = fit.residuals.len() as f64;
        let rss: f64 = fit.residuals.iter().map(|r| r * r).sum();
        if rss <= 0.0 {
            continue;
        }
        let aic = n_obs * (rss / n_obs).ln() + 2.0 * (lag + 2) as f64;
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }

    let lags = best.map(|(lag, _)| lag).unwrap_or(0);
    // Re-estimate on the largest sample the chosen lag allows
    let fit = regress(series, &diffs, lags, lags)?;
    let se = fit.std_errors[1];
    if !(se.is_finite() && se > 0.0) {
        return Err(MathError::CalculationError(
            "ADF regression has a degenerate standard error".to_string(),
        ));
    }

    let statistic = fit.coefficients[1] / se;
    if !statistic.is_finite() {
        return Err(MathError::CalculationError(
            "ADF statistic is not finite".to_string(),
        ));
    }

    Ok(AdfResult {
        statistic,
        p_value: approximate_p_value(statistic),
        lags,
        observations: fit.residuals.len(),
        is_stationary: statistic < ADF_CRITICAL_5PCT,
    })
}

/// Number of first differences (0..=max_d) needed before the ADF test
/// rejects a unit root.
///
/// A test that cannot be computed stops the search at the current order.
pub fn suggest_differences(series: &[f64], max_d: usize) -> usize {
    let mut current = series.to_vec();
    for d in 0..max_d {
        match adf_test(&current, None) {
            Ok(result) if result.is_stationary => return d,
            Ok(_) => current = difference(&current, 1),
            Err(_) => return d,
        }
    }
    max_d
}

/// `start_lag` fixes the first usable row so regressions with different
/// lag counts share one sample.
fn regress(
    series: &[f64],
    diffs: &[f64],
    lag: usize,
    start_lag: usize,
) -> Result<LeastSquaresFit> {
    let mut design = Vec::with_capacity(diffs.len());
    let mut target = Vec::with_capacity(diffs.len());
    for t in start_lag.max(lag)..diffs.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(1.0);
        row.push(series[t]);
        for i in 1..=lag {
            row.push(diffs[t - i]);
        }
        design.push(row);
        target.push(diffs[t]);
    }
    least_squares(&design, &target)
}

fn approximate_p_value(statistic: f64) -> f64 {
    let (first_stat, first_p) = DF_QUANTILES[0];
    if statistic <= first_stat {
        return first_p;
    }
    for pair in DF_QUANTILES.windows(2) {
        let (s0, p0) = pair[0];
        let (s1, p1) = pair[1];
        if statistic <= s1 {
            return p0 + (statistic - s0) / (s1 - s0) * (p1 - p0);
        }
    }
    DF_QUANTILES[DF_QUANTILES.len() - 1].1
}
