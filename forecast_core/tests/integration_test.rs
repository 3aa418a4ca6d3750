use chrono::{Duration, NaiveDate};
use forecast_core::config::{ArimaOrder, SeasonalOrder};
use forecast_core::loader::{generate_sample, SampleKind, DEFAULT_SEED};
use forecast_core::{
    CancelToken, ForecastError, ForecastOutcome, ForecastRequest, ForecastResult, ModelAdapter,
    ModelConfig, ModelKind, ModelParams, ModelSelector, Orchestrator, Series,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

// Daily series from 2023-01-01: level 100, slope 0.2 per day, N(0, 2) noise
fn trending_daily(n: usize) -> Series {
    let mut rng = StdRng::seed_from_u64(365);
    let noise = Normal::new(0.0, 2.0).unwrap();
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let timestamps = (0..n).map(|i| start + Duration::days(i as i64)).collect();
    let values = (0..n)
        .map(|i| 100.0 + 0.2 * i as f64 + noise.sample(&mut rng))
        .collect();
    Series::new("TREND", timestamps, values).unwrap()
}

fn assert_well_formed(result: &ForecastResult, horizon: usize, observations: usize) {
    assert_eq!(result.forecast.values.len(), horizon);
    assert_eq!(result.forecast.dates.len(), horizon);
    assert_eq!(result.forecast.lower_bound.len(), horizon);
    assert_eq!(result.forecast.upper_bound.len(), horizon);
    assert_eq!(result.fitted_values.len(), observations);
    assert_eq!(result.residuals.len(), observations);
    for i in 0..horizon {
        assert!(result.forecast.lower_bound[i] <= result.forecast.values[i]);
        assert!(result.forecast.values[i] <= result.forecast.upper_bound[i]);
    }
}

#[test]
fn test_arima_on_a_year_of_daily_data() {
    let series = Arc::new(trending_daily(365));
    let plan = ForecastRequest::new("arima").plan().unwrap();

    let outcome = Orchestrator::default()
        .run(Arc::clone(&series), plan.selector, &plan.config)
        .unwrap();
    let ForecastOutcome::Single(result) = outcome else {
        panic!("expected a single result");
    };

    assert_eq!(result.model, ModelKind::Arima);
    assert!(!result.degraded);
    assert_well_formed(&result, 30, 365);
    // 2023-01-01 plus 365 days of history
    assert_eq!(result.forecast.dates[0], "2024-01-01");
    assert_eq!(result.training.observations, 365);
    assert!(result.metrics.rmse < 5.0);
    assert!(result.metrics.aic.is_some());
}

#[test]
fn test_arima_on_an_annual_cycle() {
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.5).unwrap();
    let dates: Vec<String> = (0..365)
        .map(|i| (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i)).to_string())
        .collect();
    let values: Vec<f64> = (0..365)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.1 * t + 20.0 * (2.0 * std::f64::consts::PI * t / 365.25).sin() + noise.sample(&mut rng)
        })
        .collect();
    let request: ForecastRequest = serde_json::from_value(serde_json::json!({
        "model": "arima",
        "data": { "dates": dates, "values": values },
        "forecast_periods": 30,
        "confidence_interval": 95,
        "auto_params": true,
    }))
    .unwrap();

    let plan = request.plan().unwrap();
    let series = Arc::new(request.inline_series().unwrap().unwrap());
    let ForecastOutcome::Single(result) = Orchestrator::default()
        .run(series, plan.selector, &plan.config)
        .unwrap()
    else {
        panic!("expected a single result");
    };
    assert_well_formed(&result, 30, 365);
    assert!(result.metrics.rmse >= 0.0);
    assert_eq!(result.training.label, "REQUEST_DATA");
}

#[test]
fn test_fit_is_deterministic() {
    let series = Arc::new(trending_daily(200));
    let config = ModelConfig::auto(ModelKind::Arima).with_horizon(10);
    let orchestrator = Orchestrator::default();

    let first = orchestrator
        .run(Arc::clone(&series), ModelSelector::Single(ModelKind::Arima), &config)
        .unwrap();
    let second = orchestrator
        .run(series, ModelSelector::Single(ModelKind::Arima), &config)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_manual_fits_are_deterministic() {
    let series = Arc::new(trending_daily(200));
    let orchestrator = Orchestrator::default();
    let configs = [
        (
            ModelKind::Arima,
            ModelConfig::manual(ModelParams::Arima {
                order: Some(ArimaOrder { p: 2, d: 1, q: 1 }),
            }),
        ),
        (
            ModelKind::Sarima,
            ModelConfig::manual(ModelParams::Sarima {
                order: Some(ArimaOrder { p: 1, d: 1, q: 1 }),
                seasonal: Some(SeasonalOrder {
                    p: 1,
                    d: 0,
                    q: 1,
                    period: Some(7),
                }),
            }),
        ),
    ];

    for (kind, config) in configs {
        let config = config.with_horizon(14);
        let first = orchestrator
            .run(Arc::clone(&series), ModelSelector::Single(kind), &config)
            .unwrap();
        let second = orchestrator
            .run(Arc::clone(&series), ModelSelector::Single(kind), &config)
            .unwrap();
        assert_eq!(first, second, "{} forecasts differ between runs", kind);
    }
}

#[test]
fn test_negative_order_is_rejected_before_fitting() {
    let request: ForecastRequest = serde_json::from_str(
        r#"{"model": "arima", "auto_params": false, "manual_params": {"p": -1, "d": 0, "q": 0}}"#,
    )
    .unwrap();
    assert!(matches!(request.plan(), Err(ForecastError::InvalidConfig(_))));
}

#[test]
fn test_short_series_fails_for_every_family() {
    let series = trending_daily(5);
    for kind in ModelKind::ALL {
        let result = forecast_core::models::adapter_for(kind).fit_and_forecast(
            &series,
            &ModelConfig::auto(kind),
            &CancelToken::new(),
        );
        assert!(
            matches!(result, Err(ForecastError::Fit(_))),
            "{} accepted a 5-point series",
            kind
        );
    }

    let outcome = Orchestrator::default().run(
        Arc::new(series),
        ModelSelector::Compare,
        &ModelConfig::auto(ModelKind::Arima),
    );
    assert!(matches!(outcome, Err(ForecastError::AllModelsFailed(_))));
}

#[derive(Debug)]
struct AlwaysFails;

impl ModelAdapter for AlwaysFails {
    fn kind(&self) -> ModelKind {
        ModelKind::Sarima
    }

    fn fit_and_forecast(
        &self,
        _: &Series,
        _: &ModelConfig,
        _: &CancelToken,
    ) -> forecast_core::Result<ForecastResult> {
        Err(ForecastError::Fit("singular system".to_string()))
    }
}

#[test]
fn test_comparison_tolerates_a_failing_model() {
    let series = Arc::new(trending_daily(150));
    let orchestrator = Orchestrator::default().with_adapter(Arc::new(AlwaysFails));
    let config = ModelConfig::auto(ModelKind::Arima).with_horizon(14);

    let ForecastOutcome::Comparison(result) = orchestrator
        .run(series, ModelSelector::Compare, &config)
        .unwrap()
    else {
        panic!("expected a comparison");
    };

    assert!(result.partial);
    assert_eq!(result.model, "compare");
    assert_eq!(result.failures[&ModelKind::Sarima].kind, "fit");
    assert!(result.models.contains_key(&ModelKind::Arima));
    assert!(result.models.contains_key(&ModelKind::Prophet));
    for model in result.models.values() {
        assert_well_formed(model, 14, 150);
        assert_eq!(model.training, result.training);
    }
    assert_eq!(result.comparison.ranking.len(), 2);
    assert_eq!(result.comparison.best_by_aic, Some(ModelKind::Arima));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["failures"]["sarima"]["kind"], "fit");
    assert!(json["models"]["prophet"]["metrics"]["aic"].is_null());
}

#[test]
fn test_manual_arima_through_request() {
    let mut request = ForecastRequest::new("arima");
    request.auto_params = false;
    request.forecast_periods = 12;
    request.confidence_interval = 80;
    request.manual_params = Some(forecast_core::request::ManualParams { p: 1, d: 1, q: 0 });
    let plan = request.plan().unwrap();
    assert_eq!(
        plan.config.params,
        ModelParams::Arima {
            order: Some(ArimaOrder { p: 1, d: 1, q: 0 })
        }
    );

    let series = Arc::new(generate_sample(SampleKind::Economic, DEFAULT_SEED).unwrap());
    let ForecastOutcome::Single(result) = Orchestrator::default()
        .run(series, plan.selector, &plan.config)
        .unwrap()
    else {
        panic!("expected a single result");
    };
    assert_eq!(result.description, "ARIMA(1,1,0)");
    assert_well_formed(&result, 12, 168);
    // Month-end anchoring continues past 2023-12-31
    assert_eq!(result.forecast.dates[1], "2024-02-29");
}

#[test]
fn test_fast_mode_trims_history() {
    let series = Arc::new(generate_sample(SampleKind::Trend, DEFAULT_SEED).unwrap());
    let config = ModelConfig::auto(ModelKind::Prophet).with_horizon(7);
    let ForecastOutcome::Single(result) = Orchestrator::default()
        .run(series, ModelSelector::Single(ModelKind::Prophet), &config)
        .unwrap()
    else {
        panic!("expected a single result");
    };
    assert_eq!(result.training.observations, 500);
    assert_eq!(result.fitted_values.len(), 500);
}
