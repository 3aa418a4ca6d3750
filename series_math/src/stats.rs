//! Descriptive statistics and distribution helpers

use crate::{MathError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with an n-1 denominator. Returns NaN below two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample autocorrelation at `lag`, using the full-series mean and variance.
///
/// Returns 0.0 when the lag is out of range or the series is constant.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag == 0 {
        return 1.0;
    }
    if n <= lag + 1 {
        return 0.0;
    }

    let m = mean(values);
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom < 1e-12 {
        return 0.0;
    }

    let numer: f64 = values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(a, b)| (a - m) * (b - m))
        .sum();

    numer / denom
}

/// Two-sided standard normal critical value for a confidence level in (0, 1).
///
/// A level of 0.95 yields roughly 1.96.
pub fn normal_critical_value(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Confidence level must be in (0, 1), got {}",
            level
        )));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(format!("Normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&values), 3.0);
        assert_relative_eq!(variance(&values), 2.5);
        assert_relative_eq!(std_dev(&values), 2.5_f64.sqrt());
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn test_autocorrelation_periodic() {
        let values: Vec<f64> = (0..120)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        assert!(autocorrelation(&values, 12) > 0.8);
        assert!(autocorrelation(&values, 6) < -0.8);
        assert_eq!(autocorrelation(&[1.0; 20], 3), 0.0);
    }

    #[test]
    fn test_normal_critical_value() {
        assert_relative_eq!(normal_critical_value(0.95).unwrap(), 1.959964, epsilon = 1e-4);
        assert_relative_eq!(normal_critical_value(0.80).unwrap(), 1.281552, epsilon = 1e-4);
        assert!(normal_critical_value(1.0).is_err());
        assert!(normal_critical_value(0.0).is_err());
    }
}
