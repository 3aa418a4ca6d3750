//! Residual diagnostics

use crate::stats::{autocorrelation, mean, std_dev};
use crate::{MathError, Result};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Ljung-Box portmanteau test outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LjungBox {
    /// Q statistic
    pub statistic: f64,
    /// Upper-tail chi-squared probability
    pub p_value: f64,
    /// Lags included
    pub lags: usize,
}

impl LjungBox {
    /// True when the residuals look like white noise at `alpha`
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Summary of a residual sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub lag1_autocorrelation: f64,
    /// `None` when the sequence is too short for the test
    pub ljung_box: Option<LjungBox>,
}

/// Ljung-Box test on `residuals` over `lags` lags.
///
/// `fitted_params` reduces the chi-squared degrees of freedom, never
/// below one.
pub fn ljung_box(residuals: &[f64], lags: usize, fitted_params: usize) -> Result<LjungBox> {
    let n = residuals.len();
    if lags == 0 {
        return Err(MathError::InvalidInput(
            "Ljung-Box needs at least one lag".to_string(),
        ));
    }
    if n <= lags + 1 {
        return Err(MathError::InsufficientData(format!(
            "Ljung-Box with {} lags needs more than {} residuals",
            lags,
            lags + 1
        )));
    }

    let statistic = (1..=lags)
        .map(|k| autocorrelation(residuals, k).powi(2) / (n - k) as f64)
        .sum::<f64>()
        * (n * (n + 2)) as f64;

    let df = lags.saturating_sub(fitted_params).max(1);
    let chi2 = ChiSquared::new(df as f64)
        .map_err(|e| MathError::CalculationError(format!("Chi-squared: {}", e)))?;
    let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

    Ok(LjungBox {
        statistic,
        p_value,
        lags,
    })
}

/// Mean, spread, lag-1 autocorrelation and a 10-lag Ljung-Box test.
pub fn summarize_residuals(residuals: &[f64], fitted_params: usize) -> ResidualSummary {
    let lags = 10.min(residuals.len() / 5).max(1);
    ResidualSummary {
        mean: mean(residuals),
        std_dev: std_dev(residuals),
        lag1_autocorrelation: autocorrelation(residuals, 1),
        ljung_box: ljung_box(residuals, lags, fitted_params).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_residuals_are_autocorrelated() {
        let residuals: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let result = ljung_box(&residuals, 10, 0).unwrap();
        assert!(result.statistic > 50.0);
        assert!(!result.is_white_noise(0.05));
    }

    #[test]
    fn test_constant_residuals_have_zero_statistic() {
        let result = ljung_box(&[0.5; 40], 10, 2).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_too_few_residuals() {
        assert!(ljung_box(&[1.0, 2.0, 3.0], 10, 0).is_err());
        assert!(ljung_box(&[1.0; 30], 0, 0).is_err());
        let summary = summarize_residuals(&[1.0, -1.0], 0);
        assert!(summary.ljung_box.is_none());
    }
}
