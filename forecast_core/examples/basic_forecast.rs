use forecast_core::loader::{generate_sample, SampleKind, DEFAULT_SEED};
use forecast_core::request::ManualParams;
use forecast_core::{ForecastOutcome, ForecastRequest, Orchestrator};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Core: Basic Forecasting Example");
    println!("========================================\n");

    let series = Arc::new(generate_sample(SampleKind::Economic, DEFAULT_SEED)?);
    let summary = series.summary();
    println!(
        "Loaded {}: {} monthly points, mean {:.2}, std dev {:.2}\n",
        summary.label, summary.length, summary.mean, summary.std_dev
    );

    let orchestrator = Orchestrator::default();

    // Automatic order selection
    let mut request = ForecastRequest::new("arima");
    request.forecast_periods = 12;
    let plan = request.plan()?;
    if let ForecastOutcome::Single(result) = orchestrator.run(Arc::clone(&series), plan.selector, &plan.config)? {
        println!("Selected model: {}", result.description);
        println!("RMSE {:.3}, MAE {:.3}", result.metrics.rmse, result.metrics.mae);
        println!("\n12-month forecast with 95% intervals:");
        for i in 0..result.horizon() {
            println!(
                "  {}: {:.3} ({:.3}, {:.3})",
                result.forecast.dates[i],
                result.forecast.values[i],
                result.forecast.lower_bound[i],
                result.forecast.upper_bound[i]
            );
        }
    }

    // Fixed order
    let mut request = ForecastRequest::new("arima");
    request.auto_params = false;
    request.manual_params = Some(ManualParams { p: 1, d: 1, q: 0 });
    let plan = request.plan()?;
    if let ForecastOutcome::Single(result) = orchestrator.run(series, plan.selector, &plan.config)? {
        println!("\nManual model: {}", result.description);
        println!("AIC {:?}, BIC {:?}", result.metrics.aic, result.metrics.bic);
    }

    Ok(())
}
