use forecast_core::orchestrator::FailureReport;
use forecast_core::ForecastError;
use series_math::MathError;
use std::time::Duration;

#[test]
fn test_error_kinds() {
    let cases = [
        (ForecastError::InvalidConfig("p".to_string()), "invalid_config"),
        (ForecastError::Fit("singular".to_string()), "fit"),
        (
            ForecastError::Timeout {
                model: "sarima".to_string(),
                budget: Duration::from_secs(60),
            },
            "timeout",
        ),
        (ForecastError::Data("empty".to_string()), "data"),
        (ForecastError::AllModelsFailed("x".to_string()), "all_models_failed"),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind);
        assert_eq!(FailureReport::from(&err).kind, kind);
    }
}

#[test]
fn test_math_errors_become_fit_errors() {
    let err: ForecastError = MathError::ConvergenceFailure("forecast diverged".to_string()).into();
    assert!(matches!(err, ForecastError::Fit(_)));
    assert!(err.to_string().contains("forecast diverged"));
}

#[test]
fn test_timeout_message_names_model() {
    let err = ForecastError::Timeout {
        model: "prophet".to_string(),
        budget: Duration::from_secs(2),
    };
    assert_eq!(err.to_string(), "prophet did not finish within 2s");
}
