//! Seasonal period detection and classical additive decomposition

use crate::stats::{autocorrelation, variance};
use crate::{MathError, Result};
use serde::Serialize;

/// Autocorrelation a candidate period must exceed to count as seasonal
pub const ACF_SEASONAL_THRESHOLD: f64 = 0.3;

/// Seasonal strength above which a seasonal difference is applied
pub const STRONG_SEASONALITY: f64 = 0.64;

/// Additive decomposition `y = trend + seasonal + remainder`
#[derive(Debug, Clone, Serialize)]
pub struct Decomposition {
    pub period: usize,
    /// Centered moving average; `None` where the window runs off either end
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<Option<f64>>,
    /// One zero-sum index per position in the cycle
    pub seasonal_indices: Vec<f64>,
    /// Share of detrended variance explained by the seasonal component
    pub strength: f64,
}

/// Whether `values` shows autocorrelation above `threshold` at `period`.
pub fn confirms_period(values: &[f64], period: usize, threshold: f64) -> bool {
    period >= 2 && values.len() > 2 * period && autocorrelation(values, period) > threshold
}

/// First candidate, in order, that the autocorrelation confirms.
pub fn detect_period(values: &[f64], candidates: &[usize], threshold: f64) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .find(|&period| confirms_period(values, period, threshold))
}

/// Classical additive decomposition with a centered moving-average trend.
pub fn decompose_additive(values: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(MathError::InvalidInput(format!(
            "Seasonal period must be at least 2, got {}",
            period
        )));
    }
    let n = values.len();
    if n < 2 * period {
        return Err(MathError::InsufficientData(format!(
            "Decomposition with period {} needs at least {} observations, got {}",
            period,
            2 * period,
            n
        )));
    }

    let trend = centered_moving_average(values, period);

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, (value, level)) in values.iter().zip(&trend).enumerate() {
        if let Some(level) = level {
            sums[i % period] += value - level;
            counts[i % period] += 1;
        }
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|idx| *idx -= offset);

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let remainder: Vec<Option<f64>> = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((value, level), season)| level.map(|l| value - l - season))
        .collect();

    let strength = strength_from_components(&seasonal, &remainder);

    Ok(Decomposition {
        period,
        trend,
        seasonal,
        remainder,
        seasonal_indices: indices,
        strength,
    })
}

/// Seasonal strength in [0, 1]; 0 when the series is too short to decompose.
pub fn seasonal_strength(values: &[f64], period: usize) -> f64 {
    decompose_additive(values, period)
        .map(|d| d.strength)
        .unwrap_or(0.0)
}

fn strength_from_components(seasonal: &[f64], remainder: &[Option<f64>]) -> f64 {
    let (rest, combined): (Vec<f64>, Vec<f64>) = seasonal
        .iter()
        .zip(remainder)
        .filter_map(|(s, r)| r.map(|r| (r, s + r)))
        .unzip();
    let combined_var = variance(&combined);
    if !(combined_var > 1e-12) {
        return 0.0;
    }
    (1.0 - variance(&rest) / combined_var).clamp(0.0, 1.0)
}

/// Centered moving average; even periods use the 2 x period weighting.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut trend = vec![None; n];
    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[t - half..=t + half];
        let level = if period % 2 == 0 {
            let inner: f64 = window[1..period].iter().sum();
            (inner + 0.5 * (window[0] + window[period])) / period as f64
        } else {
            window.iter().sum::<f64>() / period as f64
        };
        *slot = Some(level);
    }
    trend
}
