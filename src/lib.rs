//! # Foresight
//!
//! Umbrella crate for the forecasting workspace. It re-exports the
//! forecasting engine (`forecast_core`) and its numerical building blocks
//! (`series_math`); the HTTP API lives in the `forecast_server` binary.
//!
//! ## Example
//!
//! ```
//! use foresight_workspace::{ForecastRequest, ModelKind, ModelSelector};
//!
//! let plan = ForecastRequest::new("sarima").plan().unwrap();
//! assert_eq!(plan.selector, ModelSelector::Single(ModelKind::Sarima));
//! assert_eq!(plan.config.horizon, 30);
//! ```

pub use forecast_core::*;
pub use series_math;

/// Names of the model families a request may ask for, `compare` included
pub fn model_names() -> Vec<&'static str> {
    ModelKind::ALL
        .iter()
        .map(ModelKind::as_str)
        .chain(std::iter::once("compare"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        assert_eq!(model_names(), vec!["arima", "sarima", "prophet", "compare"]);
    }

    #[test]
    fn test_every_name_plans() {
        for name in model_names() {
            assert!(ForecastRequest::new(name).plan().is_ok(), "{} did not plan", name);
        }
    }

    #[test]
    fn test_math_reexport() {
        assert_eq!(series_math::differencing::difference(&[1.0, 3.0, 6.0], 1), vec![2.0, 3.0]);
    }
}
