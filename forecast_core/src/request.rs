//! Wire format of a forecast request
//!
//! Integer fields are signed so that out-of-range values such as `p: -1`
//! reach validation and come back as configuration errors rather than as
//! decoding failures.

use crate::config::{AdditiveParams, ArimaOrder, ModelConfig, ModelKind, ModelParams, ModelSelector, SeasonalOrder, MAX_HORIZON};
use crate::error::{ForecastError, Result};
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Lowest accepted confidence percentage
pub const MIN_CONFIDENCE_PERCENT: i64 = 80;
/// Highest accepted confidence percentage
pub const MAX_CONFIDENCE_PERCENT: i64 = 99;

/// Label given to series sent inline with a request
pub const INLINE_LABEL: &str = "REQUEST_DATA";

fn default_periods() -> i64 {
    30
}

fn default_confidence() -> i64 {
    95
}

fn default_true() -> bool {
    true
}

fn default_order() -> i64 {
    1
}

/// Series sent as parallel date and value arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

impl SeriesPayload {
    pub fn from_series(series: &Series) -> Self {
        Self {
            dates: series.date_strings(),
            values: series.values().to_vec(),
        }
    }

    pub fn into_series(self, label: &str) -> Result<Series> {
        Series::from_strings(label, &self.dates, self.values)
    }
}

/// Manual `(p, d, q)`; missing keys default to 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualParams {
    #[serde(default = "default_order")]
    pub p: i64,
    #[serde(default = "default_order")]
    pub d: i64,
    #[serde(default = "default_order")]
    pub q: i64,
}

/// Manual `(P, D, Q)[period]`; missing orders default to 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalParams {
    #[serde(rename = "P", default = "default_order")]
    pub p: i64,
    #[serde(rename = "D", default = "default_order")]
    pub d: i64,
    #[serde(rename = "Q", default = "default_order")]
    pub q: i64,
    #[serde(default)]
    pub period: Option<i64>,
}

/// A forecast request as received over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// `arima`, `sarima`, `prophet` or `compare`
    pub model: String,
    /// Inline series; the stored series is used when absent
    #[serde(default)]
    pub data: Option<SeriesPayload>,
    #[serde(default = "default_periods")]
    pub forecast_periods: i64,
    /// Interval coverage in percent
    #[serde(default = "default_confidence")]
    pub confidence_interval: i64,
    #[serde(default = "default_true")]
    pub auto_params: bool,
    #[serde(default = "default_true")]
    pub fast_mode: bool,
    #[serde(default)]
    pub manual_params: Option<ManualParams>,
    #[serde(default)]
    pub seasonal_params: Option<SeasonalParams>,
    #[serde(default)]
    pub additive_params: Option<AdditiveParams>,
}

/// A validated request, ready for the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPlan {
    pub selector: ModelSelector,
    pub config: ModelConfig,
}

impl ForecastRequest {
    /// A request for `model` with every other field at its default
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            data: None,
            forecast_periods: default_periods(),
            confidence_interval: default_confidence(),
            auto_params: true,
            fast_mode: true,
            manual_params: None,
            seasonal_params: None,
            additive_params: None,
        }
    }

    /// Resolve the selector and a validated model configuration
    pub fn plan(&self) -> Result<ForecastPlan> {
        let selector: ModelSelector = self.model.parse()?;
        let horizon = to_usize("forecast_periods", self.forecast_periods)?;
        if horizon == 0 || horizon > MAX_HORIZON {
            return Err(ForecastError::InvalidConfig(format!(
                "forecast_periods must be between 1 and {}, got {}",
                MAX_HORIZON, self.forecast_periods
            )));
        }
        if !(MIN_CONFIDENCE_PERCENT..=MAX_CONFIDENCE_PERCENT).contains(&self.confidence_interval) {
            return Err(ForecastError::InvalidConfig(format!(
                "confidence_interval must be between {} and {}, got {}",
                MIN_CONFIDENCE_PERCENT, MAX_CONFIDENCE_PERCENT, self.confidence_interval
            )));
        }

        let additive = || ModelParams::Additive(self.additive_params.clone().unwrap_or_default());
        let (params, auto_params) = match selector {
            // Comparisons always search; additive settings still apply
            ModelSelector::Compare => (additive(), true),
            ModelSelector::Single(ModelKind::Prophet) => (additive(), self.auto_params),
            ModelSelector::Single(ModelKind::Arima) => (
                ModelParams::Arima {
                    order: self.manual_order()?,
                },
                self.auto_params,
            ),
            ModelSelector::Single(ModelKind::Sarima) => (
                ModelParams::Sarima {
                    order: self.manual_order()?,
                    seasonal: self.seasonal_order()?,
                },
                self.auto_params,
            ),
        };

        let config = ModelConfig {
            auto_params,
            params,
            ..ModelConfig::auto(ModelKind::Arima)
        }
        .with_horizon(horizon)
        .with_confidence(self.confidence_interval as f64 / 100.0)
        .with_fast_mode(self.fast_mode);
        config.validate()?;

        Ok(ForecastPlan { selector, config })
    }

    /// The inline series, if the request carries one
    pub fn inline_series(&self) -> Result<Option<Series>> {
        self.data
            .clone()
            .map(|payload| payload.into_series(INLINE_LABEL))
            .transpose()
    }

    fn manual_order(&self) -> Result<Option<ArimaOrder>> {
        if self.auto_params {
            return Ok(None);
        }
        self.manual_params
            .map(|m| {
                Ok(ArimaOrder {
                    p: to_usize("p", m.p)?,
                    d: to_usize("d", m.d)?,
                    q: to_usize("q", m.q)?,
                })
            })
            .transpose()
    }

    fn seasonal_order(&self) -> Result<Option<SeasonalOrder>> {
        if self.auto_params {
            return Ok(None);
        }
        // Seasonal orders default to (1, 1, 1) when only (p, d, q) is sent
        let seasonal = self.seasonal_params.unwrap_or(SeasonalParams {
            p: 1,
            d: 1,
            q: 1,
            period: None,
        });
        Ok(Some(SeasonalOrder {
            p: to_usize("P", seasonal.p)?,
            d: to_usize("D", seasonal.d)?,
            q: to_usize("Q", seasonal.q)?,
            period: seasonal
                .period
                .map(|period| to_usize("period", period))
                .transpose()?,
        }))
    }
}

fn to_usize(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ForecastError::InvalidConfig(format!("{} must be non-negative, got {}", name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_minimal_json() {
        let request: ForecastRequest = serde_json::from_str(r#"{"model": "arima"}"#).unwrap();
        assert_eq!(request, ForecastRequest::new("arima"));

        let plan = request.plan().unwrap();
        assert_eq!(plan.selector, ModelSelector::Single(ModelKind::Arima));
        assert_eq!(plan.config.horizon, 30);
        assert_eq!(plan.config.confidence, 0.95);
        assert!(plan.config.auto_params);
        assert!(plan.config.fast_mode);
    }

    #[test]
    fn test_negative_order_is_invalid_config() {
        let request: ForecastRequest = serde_json::from_str(
            r#"{"model": "arima", "auto_params": false, "manual_params": {"p": -1, "d": 1, "q": 1}}"#,
        )
        .unwrap();
        assert!(matches!(request.plan(), Err(ForecastError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_manual_keys_default_to_one() {
        let request: ForecastRequest = serde_json::from_str(
            r#"{"model": "arima", "auto_params": false, "manual_params": {"p": 2}}"#,
        )
        .unwrap();
        let plan = request.plan().unwrap();
        assert_eq!(
            plan.config.params,
            ModelParams::Arima {
                order: Some(ArimaOrder { p: 2, d: 1, q: 1 })
            }
        );
    }

    #[test]
    fn test_manual_mode_without_params_is_rejected() {
        let mut request = ForecastRequest::new("arima");
        request.auto_params = false;
        assert!(matches!(request.plan(), Err(ForecastError::InvalidConfig(_))));
    }

    #[test]
    fn test_bounds_on_shared_fields() {
        let mut request = ForecastRequest::new("prophet");
        request.forecast_periods = 0;
        assert!(request.plan().is_err());
        request.forecast_periods = 1001;
        assert!(request.plan().is_err());
        request.forecast_periods = 10;
        request.confidence_interval = 79;
        assert!(request.plan().is_err());
        request.confidence_interval = 99;
        assert_eq!(request.plan().unwrap().config.confidence, 0.99);
    }

    #[test]
    fn test_compare_runs_in_auto_mode() {
        let mut request = ForecastRequest::new("compare");
        request.auto_params = false;
        request.fast_mode = false;
        let plan = request.plan().unwrap();
        assert_eq!(plan.selector, ModelSelector::Compare);
        assert!(plan.config.auto_params);
        assert!(!plan.config.fast_mode);
    }

    #[test]
    fn test_inline_series() {
        let request: ForecastRequest = serde_json::from_str(
            r#"{"model": "arima", "data": {"dates": ["2024-01-01", "2024-01-02"], "values": [1.0, 2.0]}}"#,
        )
        .unwrap();
        let series = request.inline_series().unwrap().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.label(), INLINE_LABEL);
        assert!(ForecastRequest::new("arima").inline_series().unwrap().is_none());
    }
}
