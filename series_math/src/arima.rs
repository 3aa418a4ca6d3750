//! Seasonal ARIMA estimation by conditional sum of squares
//!
//! The model for the differenced series `w_t = (1-B)^d (1-B^s)^D y_t` is
//!
//! ```text
//! phi(B) PHI(B^s) (w_t - mu) = theta(B) THETA(B^s) e_t
//! ```
//!
//! with `mu` estimated only when the total differencing order is below
//! two (a drift term once the series has been differenced once). The
//! coefficients are fitted with a bounded Nelder-Mead search over the
//! conditional sum of squared innovations; forecasts run the recursion
//! forward and integrate back to the original scale, with intervals from
//! the psi-weight expansion of the full model.

use crate::differencing::{difference, differencing_polynomial, integrate, poly_mul, seasonal_difference};
use crate::optimization::{nelder_mead_until, SimplexConfig};
use crate::stats::{mean, normal_critical_value};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Bound applied to every AR and MA coefficient during estimation
const COEFFICIENT_BOUND: f64 = 0.99;

/// Floor on the innovation variance
const MIN_SIGMA2: f64 = 1e-12;

/// Orders of a (seasonal) ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SarimaSpec {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    /// Seasonal period; 0 for a non-seasonal model
    pub period: usize,
}

impl SarimaSpec {
    /// Non-seasonal ARIMA(p, d, q)
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            period: 0,
        }
    }

    /// Seasonal ARIMA(p, d, q)(P, D, Q)[period]
    pub fn seasonal(
        (p, d, q): (usize, usize, usize),
        (seasonal_p, seasonal_d, seasonal_q): (usize, usize, usize),
        period: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            period,
        }
    }

    /// True when a seasonal term is active
    pub fn is_seasonal(&self) -> bool {
        self.period >= 2 && self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }

    fn effective_period(&self) -> usize {
        if self.is_seasonal() {
            self.period
        } else {
            0
        }
    }

    fn effective_seasonal(&self) -> (usize, usize, usize) {
        if self.is_seasonal() {
            (self.seasonal_p, self.seasonal_d, self.seasonal_q)
        } else {
            (0, 0, 0)
        }
    }

    /// Whether a mean (or drift) term is estimated
    pub fn includes_mean(&self) -> bool {
        self.d + self.effective_seasonal().1 < 2
    }

    /// Estimated coefficients, excluding the innovation variance
    pub fn num_params(&self) -> usize {
        let (sp, _, sq) = self.effective_seasonal();
        usize::from(self.includes_mean()) + self.p + self.q + sp + sq
    }

    /// Observations lost to differencing
    pub fn differencing_lags(&self) -> usize {
        self.d + self.effective_seasonal().1 * self.effective_period()
    }

    /// Highest lag of the expanded AR polynomial
    pub fn ar_lags(&self) -> usize {
        self.p + self.effective_seasonal().0 * self.effective_period()
    }

    /// Shortest series this model can be estimated on
    pub fn min_observations(&self) -> usize {
        self.differencing_lags() + self.ar_lags() + self.num_params() + 3
    }
}

impl fmt::Display for SarimaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_seasonal() {
            write!(
                f,
                "SARIMA({},{},{})({},{},{})[{}]",
                self.p,
                self.d,
                self.q,
                self.seasonal_p,
                self.seasonal_d,
                self.seasonal_q,
                self.period
            )
        } else {
            write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
        }
    }
}

/// Estimated coefficients of a fitted model
#[derive(Debug, Clone, Serialize)]
pub struct SarimaCoefficients {
    pub mean: Option<f64>,
    pub ar: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

/// Point forecasts with symmetric prediction intervals
#[derive(Debug, Clone)]
pub struct SarimaForecast {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub std_errors: Vec<f64>,
}

/// A fitted seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct SarimaFit {
    pub spec: SarimaSpec,
    pub coefficients: SarimaCoefficients,
    /// Innovation variance
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    /// One-step-ahead predictions on the original scale, one per observation
    pub fitted: Vec<f64>,
    /// `actual - fitted`, one per observation
    pub residuals: Vec<f64>,
    /// Innovations that entered the likelihood
    pub effective_observations: usize,
    history: Vec<f64>,
    differenced: Vec<f64>,
    innovations: Vec<f64>,
    ar_full: Vec<f64>,
    ma_full: Vec<f64>,
    mu: f64,
}

/// Expanded lag structure built from a parameter vector
struct Structure {
    mu: f64,
    /// `ar_full[k]` multiplies `w_{t-k} - mu`; index 0 unused
    ar_full: Vec<f64>,
    /// `ma_full[k]` multiplies `e_{t-k}`; index 0 unused
    ma_full: Vec<f64>,
}

impl SarimaFit {
    /// Fit `spec` to `series`.
    pub fn fit(series: &[f64], spec: SarimaSpec) -> Result<Self> {
        Self::fit_until(series, spec, || false)
    }

    /// [`SarimaFit::fit`], polling `stop` once per optimizer iteration.
    ///
    /// Returns [`MathError::Interrupted`] as soon as `stop` answers true.
    pub fn fit_until<S: Fn() -> bool>(series: &[f64], spec: SarimaSpec, stop: S) -> Result<Self> {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }
        let needed = spec.min_observations();
        if series.len() < needed {
            return Err(MathError::InsufficientData(format!(
                "{} needs at least {} observations, got {}",
                spec,
                needed,
                series.len()
            )));
        }

        let (_, seasonal_d, _) = spec.effective_seasonal();
        let period = spec.effective_period();
        let differenced = seasonal_difference(&difference(series, spec.d), seasonal_d, period);
        let start = spec.ar_lags();
        if differenced.len() <= start + spec.num_params() {
            return Err(MathError::InsufficientData(format!(
                "{} leaves too few observations after differencing",
                spec
            )));
        }

        let initial = initial_params(&spec, &differenced);
        let bounds = param_bounds(&spec);
        let config = SimplexConfig {
            max_iter: 500 + 200 * initial.len(),
            ..SimplexConfig::default()
        };
        let objective = |params: &[f64]| {
            let structure = expand(&spec, params);
            let innovations = css_innovations(&differenced, &structure, start);
            innovations[start..].iter().map(|e| e * e).sum::<f64>()
        };
        let optimum = nelder_mead_until(objective, &initial, Some(&bounds), &config, stop);
        if optimum.interrupted {
            return Err(MathError::Interrupted(format!(
                "{} stopped after {} iterations",
                spec, optimum.iterations
            )));
        }

        if !optimum.value.is_finite()
            || optimum.value >= f64::MAX
            || optimum.point.iter().any(|p| !p.is_finite())
        {
            return Err(MathError::ConvergenceFailure(format!(
                "{} produced a non-finite sum of squares",
                spec
            )));
        }

        let structure = expand(&spec, &optimum.point);
        let innovations = css_innovations(&differenced, &structure, start);
        let n_eff = differenced.len() - start;
        let css: f64 = innovations[start..].iter().map(|e| e * e).sum();
        let sigma2 = (css / n_eff as f64).max(MIN_SIGMA2);

        let n = n_eff as f64;
        let k = (spec.num_params() + 1) as f64;
        let log_likelihood = -0.5 * n * ((2.0 * PI * sigma2).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n.ln();
        if !(log_likelihood.is_finite() && aic.is_finite() && bic.is_finite()) {
            return Err(MathError::ConvergenceFailure(format!(
                "{} produced a non-finite likelihood",
                spec
            )));
        }

        let lost = spec.differencing_lags();
        let mut fitted = Vec::with_capacity(series.len());
        for (t, &actual) in series.iter().enumerate() {
            let value = match t.checked_sub(lost) {
                Some(j) if j >= start => actual - innovations[j],
                _ if t == 0 => actual,
                _ => series[t - 1],
            };
            fitted.push(value);
        }
        let residuals = series.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        Ok(Self {
            spec,
            coefficients: coefficients(&spec, &optimum.point),
            sigma2,
            log_likelihood,
            aic,
            bic,
            fitted,
            residuals,
            effective_observations: n_eff,
            history: series.to_vec(),
            differenced,
            innovations,
            ar_full: structure.ar_full,
            ma_full: structure.ma_full,
            mu: structure.mu,
        })
    }

    /// Forecast `horizon` steps with intervals at `level` (fraction in (0, 1)).
    pub fn forecast(&self, horizon: usize, level: f64) -> Result<SarimaForecast> {
        if horizon == 0 {
            return Err(MathError::InvalidInput(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        let z = normal_critical_value(level)?;

        let mut w = self.differenced.clone();
        let mut e = self.innovations.clone();
        for _ in 0..horizon {
            let t = w.len();
            let mut next = self.mu;
            for (k, &coef) in self.ar_full.iter().enumerate().skip(1) {
                if t >= k {
                    next += coef * (w[t - k] - self.mu);
                }
            }
            for (k, &coef) in self.ma_full.iter().enumerate().skip(1) {
                if t >= k {
                    next += coef * e[t - k];
                }
            }
            w.push(next);
            e.push(0.0);
        }

        let (_, seasonal_d, _) = self.spec.effective_seasonal();
        let diff_poly =
            differencing_polynomial(self.spec.d, seasonal_d, self.spec.effective_period());
        let point = integrate(&w[self.differenced.len()..], &self.history, &diff_poly);

        let psi = self.psi_weights(horizon, &diff_poly);
        let mut cumulative = 0.0;
        let mut std_errors = Vec::with_capacity(horizon);
        for weight in &psi {
            cumulative += weight * weight;
            std_errors.push((self.sigma2 * cumulative).sqrt());
        }

        let lower: Vec<f64> = point.iter().zip(&std_errors).map(|(m, s)| m - z * s).collect();
        let upper: Vec<f64> = point.iter().zip(&std_errors).map(|(m, s)| m + z * s).collect();
        if point
            .iter()
            .chain(&lower)
            .chain(&upper)
            .any(|v| !v.is_finite())
        {
            return Err(MathError::ConvergenceFailure(format!(
                "{} forecast diverged",
                self.spec
            )));
        }

        Ok(SarimaForecast {
            mean: point,
            lower,
            upper,
            std_errors,
        })
    }

    /// Psi weights of the full (integrated) model, `psi[0] = 1`.
    fn psi_weights(&self, horizon: usize, diff_poly: &[f64]) -> Vec<f64> {
        let mut ar_poly = vec![1.0];
        ar_poly.extend(self.ar_full.iter().skip(1).map(|c| -c));
        let full_ar = poly_mul(&ar_poly, diff_poly);

        let mut psi = vec![0.0; horizon];
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = self.ma_full.get(j).copied().unwrap_or(0.0);
            for i in 1..=j.min(full_ar.len() - 1) {
                value -= full_ar[i] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }
}

fn initial_params(spec: &SarimaSpec, differenced: &[f64]) -> Vec<f64> {
    let mut params = Vec::with_capacity(spec.num_params());
    if spec.includes_mean() {
        params.push(mean(differenced));
    }
    params.resize(spec.num_params(), 0.0);
    params
}

fn param_bounds(spec: &SarimaSpec) -> Vec<(f64, f64)> {
    let mut bounds = Vec::with_capacity(spec.num_params());
    if spec.includes_mean() {
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }
    bounds.resize(spec.num_params(), (-COEFFICIENT_BOUND, COEFFICIENT_BOUND));
    bounds
}

/// Split a parameter vector into `(mean, phi, PHI, theta, THETA)` slices.
fn split<'a>(spec: &SarimaSpec, params: &'a [f64]) -> (Option<f64>, [&'a [f64]; 4]) {
    let (sp, _, sq) = spec.effective_seasonal();
    let mut rest = params;
    let mu = if spec.includes_mean() {
        let (head, tail) = rest.split_at(1);
        rest = tail;
        Some(head[0])
    } else {
        None
    };
    let (ar, rest) = rest.split_at(spec.p);
    let (sar, rest) = rest.split_at(sp);
    let (ma, rest) = rest.split_at(spec.q);
    let (sma, _) = rest.split_at(sq);
    (mu, [ar, sar, ma, sma])
}

fn coefficients(spec: &SarimaSpec, params: &[f64]) -> SarimaCoefficients {
    let (mu, [ar, sar, ma, sma]) = split(spec, params);
    SarimaCoefficients {
        mean: mu,
        ar: ar.to_vec(),
        seasonal_ar: sar.to_vec(),
        ma: ma.to_vec(),
        seasonal_ma: sma.to_vec(),
    }
}

/// Lag polynomial `1 + sign * sum c_i B^(i*step)`
fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn expand(spec: &SarimaSpec, params: &[f64]) -> Structure {
    let (mu, [ar, sar, ma, sma]) = split(spec, params);
    let period = spec.effective_period().max(1);

    let ar_poly = poly_mul(
        &lag_polynomial(ar, 1, -1.0),
        &lag_polynomial(sar, period, -1.0),
    );
    let ma_poly = poly_mul(&lag_polynomial(ma, 1, 1.0), &lag_polynomial(sma, period, 1.0));

    let mut ar_full: Vec<f64> = ar_poly.iter().map(|c| -c).collect();
    ar_full[0] = 0.0;
    let mut ma_full = ma_poly;
    ma_full[0] = 0.0;

    Structure {
        mu: mu.unwrap_or(0.0),
        ar_full,
        ma_full,
    }
}

/// Conditional innovations; the first `start` values are held at zero.
fn css_innovations(w: &[f64], structure: &Structure, start: usize) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        let mut prediction = structure.mu;
        for (k, &coef) in structure.ar_full.iter().enumerate().skip(1) {
            if coef != 0.0 {
                prediction += coef * (w[t - k] - structure.mu);
            }
        }
        for (k, &coef) in structure.ma_full.iter().enumerate().skip(1) {
            if coef != 0.0 && t >= k {
                prediction += coef * e[t - k];
            }
        }
        e[t] = w[t] - prediction;
    }
    e
}
