//! Model selection and per-model configuration

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest forecast horizon accepted
pub const MAX_HORIZON: usize = 1000;

/// Accepted ranges for manually supplied orders
pub const MAX_AR_ORDER: usize = 10;
pub const MAX_MA_ORDER: usize = 10;
pub const MAX_DIFFERENCING: usize = 3;
pub const MAX_SEASONAL_ORDER: usize = 5;
pub const MAX_SEASONAL_DIFFERENCING: usize = 2;
pub const MIN_SEASONAL_PERIOD: usize = 2;
pub const MAX_SEASONAL_PERIOD: usize = 366;

/// A model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Arima,
    Sarima,
    /// Additive trend/seasonality/holiday model
    Prophet,
}

impl ModelKind {
    /// Every family, in comparison order
    pub const ALL: [ModelKind; 3] = [ModelKind::Arima, ModelKind::Sarima, ModelKind::Prophet];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Arima => "arima",
            ModelKind::Sarima => "sarima",
            ModelKind::Prophet => "prophet",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arima" => Ok(ModelKind::Arima),
            "sarima" => Ok(ModelKind::Sarima),
            "prophet" | "additive" => Ok(ModelKind::Prophet),
            other => Err(ForecastError::InvalidConfig(format!(
                "Unknown model '{}'; expected arima, sarima, prophet or compare",
                other
            ))),
        }
    }
}

/// Which adapters a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelector {
    Single(ModelKind),
    Compare,
}

impl FromStr for ModelSelector {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("compare") {
            Ok(ModelSelector::Compare)
        } else {
            s.parse().map(ModelSelector::Single)
        }
    }
}

/// Non-seasonal orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal orders; the period falls back to the series' frequency when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    #[serde(rename = "P")]
    pub p: usize,
    #[serde(rename = "D")]
    pub d: usize,
    #[serde(rename = "Q")]
    pub q: usize,
    #[serde(default)]
    pub period: Option<usize>,
}

/// Named event dates that share one additive effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidaySpec {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub lower_window: i64,
    #[serde(default)]
    pub upper_window: i64,
}

/// Settings for the additive trend/seasonality model
///
/// Seasonality flags left as `None` are resolved from the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveParams {
    pub yearly_seasonality: Option<bool>,
    pub weekly_seasonality: Option<bool>,
    pub daily_seasonality: Option<bool>,
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    pub holidays: Vec<HolidaySpec>,
}

impl Default for AdditiveParams {
    fn default() -> Self {
        Self {
            yearly_seasonality: None,
            weekly_seasonality: None,
            daily_seasonality: Some(false),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            holidays: Vec::new(),
        }
    }
}

/// Model-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum ModelParams {
    Arima {
        order: Option<ArimaOrder>,
    },
    Sarima {
        order: Option<ArimaOrder>,
        seasonal: Option<SeasonalOrder>,
    },
    #[serde(rename = "prophet")]
    Additive(AdditiveParams),
}

impl ModelParams {
    /// Parameters for auto mode of `kind`
    pub fn auto(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Arima => ModelParams::Arima { order: None },
            ModelKind::Sarima => ModelParams::Sarima {
                order: None,
                seasonal: None,
            },
            ModelKind::Prophet => ModelParams::Additive(AdditiveParams::default()),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::Arima { .. } => ModelKind::Arima,
            ModelParams::Sarima { .. } => ModelKind::Sarima,
            ModelParams::Additive(_) => ModelKind::Prophet,
        }
    }
}

/// Bounds of the automatic order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// ARIMA AR/MA caps
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    /// Non-seasonal AR/MA caps inside the seasonal search
    pub sarima_max_p: usize,
    pub sarima_max_q: usize,
    pub max_seasonal_p: usize,
    pub max_seasonal_q: usize,
    pub max_seasonal_d: usize,
    /// Cap on `p + d + q`
    pub max_order_sum: usize,
    /// Cap on `P + D + Q`
    pub max_seasonal_order_sum: usize,
}

impl SearchLimits {
    /// Full search grid
    pub fn full() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            sarima_max_p: 3,
            sarima_max_q: 3,
            max_seasonal_p: 2,
            max_seasonal_q: 2,
            max_seasonal_d: 1,
            max_order_sum: 4,
            max_seasonal_order_sum: 3,
        }
    }

    /// Reduced grid used in fast mode
    pub fn fast() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            sarima_max_p: 2,
            sarima_max_q: 2,
            max_seasonal_p: 1,
            max_seasonal_q: 1,
            ..Self::full()
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::fast()
    }
}

/// Configuration of a single adapter invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of future steps
    pub horizon: usize,
    /// Interval coverage as a fraction in (0, 1)
    pub confidence: f64,
    /// Search the order grid instead of using `params` verbatim
    pub auto_params: bool,
    /// Fit on the most recent window only and search the reduced grid
    #[serde(default = "default_fast_mode")]
    pub fast_mode: bool,
    #[serde(default)]
    pub limits: SearchLimits,
    #[serde(flatten)]
    pub params: ModelParams,
}

impl ModelConfig {
    /// Auto-mode configuration for `kind` with a 30-step, 95% forecast
    pub fn auto(kind: ModelKind) -> Self {
        Self {
            horizon: 30,
            confidence: 0.95,
            auto_params: true,
            fast_mode: true,
            limits: SearchLimits::fast(),
            params: ModelParams::auto(kind),
        }
    }

    /// Manual-mode configuration using `params` verbatim
    pub fn manual(params: ModelParams) -> Self {
        Self {
            auto_params: false,
            params,
            ..Self::auto(ModelKind::Arima)
        }
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Switch fast mode, picking the matching search grid
    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self.limits = if fast_mode {
            SearchLimits::fast()
        } else {
            SearchLimits::full()
        };
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.params.kind()
    }

    /// The configuration a comparison run hands to `kind`: same shared
    /// fields, auto-parameter mode, and this config's params if they are
    /// for the same family.
    pub fn for_comparison(&self, kind: ModelKind) -> Self {
        let params = if self.params.kind() == kind {
            self.params.clone()
        } else {
            ModelParams::auto(kind)
        };
        Self {
            auto_params: true,
            params,
            ..self.clone()
        }
    }

    /// Check shared fields, and manual parameters when `auto_params` is off.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 || self.horizon > MAX_HORIZON {
            return Err(ForecastError::InvalidConfig(format!(
                "Forecast horizon must be between 1 and {}, got {}",
                MAX_HORIZON, self.horizon
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "Confidence level must be in (0, 1), got {}",
                self.confidence
            )));
        }

        match &self.params {
            ModelParams::Arima { order } => {
                if !self.auto_params {
                    validate_order(require(order, "ARIMA order (p, d, q)")?)?;
                }
            }
            ModelParams::Sarima { order, seasonal } => {
                if !self.auto_params {
                    validate_order(require(order, "SARIMA order (p, d, q)")?)?;
                    validate_seasonal(require(seasonal, "SARIMA seasonal order (P, D, Q)")?)?;
                }
            }
            // Additive settings apply in both modes
            ModelParams::Additive(params) => validate_additive(params)?,
        }
        Ok(())
    }
}

fn default_fast_mode() -> bool {
    true
}

fn require<'a, T>(value: &'a Option<T>, what: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        ForecastError::InvalidConfig(format!("{} is required when auto_params is false", what))
    })
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        return Err(ForecastError::InvalidConfig(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

fn validate_order(order: &ArimaOrder) -> Result<()> {
    check_range("p", order.p, 0, MAX_AR_ORDER)?;
    check_range("d", order.d, 0, MAX_DIFFERENCING)?;
    check_range("q", order.q, 0, MAX_MA_ORDER)
}

fn validate_seasonal(order: &SeasonalOrder) -> Result<()> {
    check_range("P", order.p, 0, MAX_SEASONAL_ORDER)?;
    check_range("D", order.d, 0, MAX_SEASONAL_DIFFERENCING)?;
    check_range("Q", order.q, 0, MAX_SEASONAL_ORDER)?;
    if let Some(period) = order.period {
        check_range("period", period, MIN_SEASONAL_PERIOD, MAX_SEASONAL_PERIOD)?;
    }
    Ok(())
}

fn validate_additive(params: &AdditiveParams) -> Result<()> {
    if !(params.changepoint_range > 0.0 && params.changepoint_range <= 1.0) {
        return Err(ForecastError::InvalidConfig(format!(
            "changepoint_range must be in (0, 1], got {}",
            params.changepoint_range
        )));
    }
    for (name, scale) in [
        ("changepoint_prior_scale", params.changepoint_prior_scale),
        ("seasonality_prior_scale", params.seasonality_prior_scale),
        ("holidays_prior_scale", params.holidays_prior_scale),
    ] {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ForecastError::InvalidConfig(format!(
                "{} must be positive, got {}",
                name, scale
            )));
        }
    }
    for holiday in &params.holidays {
        if holiday.lower_window > 0 || holiday.upper_window < 0 {
            return Err(ForecastError::InvalidConfig(format!(
                "Holiday '{}' needs lower_window <= 0 <= upper_window",
                holiday.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selector_parsing() {
        assert_eq!("compare".parse::<ModelSelector>().unwrap(), ModelSelector::Compare);
        assert_eq!(
            "SARIMA".parse::<ModelSelector>().unwrap(),
            ModelSelector::Single(ModelKind::Sarima)
        );
        assert!("lstm".parse::<ModelSelector>().is_err());
    }

    #[test]
    fn test_manual_mode_requires_params() {
        let config = ModelConfig::manual(ModelParams::Arima { order: None });
        assert!(matches!(config.validate(), Err(ForecastError::InvalidConfig(_))));

        let config = ModelConfig::manual(ModelParams::Arima {
            order: Some(ArimaOrder { p: 11, d: 0, q: 0 }),
        });
        assert!(matches!(config.validate(), Err(ForecastError::InvalidConfig(_))));

        let config = ModelConfig::manual(ModelParams::Arima {
            order: Some(ArimaOrder { p: 2, d: 1, q: 2 }),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seasonal_period_bounds() {
        let config = ModelConfig::manual(ModelParams::Sarima {
            order: Some(ArimaOrder { p: 1, d: 0, q: 0 }),
            seasonal: Some(SeasonalOrder { p: 1, d: 0, q: 0, period: Some(1) }),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_field_bounds() {
        let config = ModelConfig::auto(ModelKind::Arima).with_horizon(0);
        assert!(config.validate().is_err());
        let config = ModelConfig::auto(ModelKind::Arima).with_horizon(1001);
        assert!(config.validate().is_err());
        let config = ModelConfig::auto(ModelKind::Arima).with_confidence(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_comparison_variant_keeps_shared_fields() {
        let base = ModelConfig::manual(ModelParams::Arima {
            order: Some(ArimaOrder { p: 1, d: 1, q: 1 }),
        })
        .with_horizon(12)
        .with_confidence(0.8);

        let sarima = base.for_comparison(ModelKind::Sarima);
        assert!(sarima.auto_params);
        assert_eq!(sarima.horizon, 12);
        assert_eq!(sarima.confidence, 0.8);
        assert_eq!(sarima.kind(), ModelKind::Sarima);

        let arima = base.for_comparison(ModelKind::Arima);
        assert_eq!(arima.params, base.params);
    }

    #[test]
    fn test_fast_limits_shrink_grid() {
        let fast = SearchLimits::fast();
        let full = SearchLimits::full();
        assert_eq!((fast.max_p, fast.max_q), (3, 3));
        assert_eq!((full.max_p, full.max_q), (5, 5));
        assert!(fast.max_seasonal_p < full.max_seasonal_p);

        let config = ModelConfig::auto(ModelKind::Sarima).with_fast_mode(false);
        assert!(!config.fast_mode);
        assert_eq!(config.limits, full);
    }
}
