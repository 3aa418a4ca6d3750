use forecast_core::loader::{generate_sample, SampleKind, DEFAULT_SEED};
use forecast_core::{ForecastOutcome, ForecastRequest, Orchestrator, OrchestratorSettings};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Core: Model Comparison Example");
    println!("=======================================\n");

    let series = Arc::new(generate_sample(SampleKind::Temperature, DEFAULT_SEED)?);
    println!("Loaded {} daily temperature readings\n", series.len());

    let orchestrator = Orchestrator::new(OrchestratorSettings {
        budget: Duration::from_secs(30),
        ..OrchestratorSettings::default()
    });

    let mut request = ForecastRequest::new("compare");
    request.forecast_periods = 14;
    let plan = request.plan()?;

    let ForecastOutcome::Comparison(result) = orchestrator.run(series, plan.selector, &plan.config)? else {
        return Err("compare request returned a single model".into());
    };

    println!(
        "Trained on {} observations ({} to {})",
        result.training.observations, result.training.start, result.training.end
    );

    println!("\nRanking by in-sample RMSE:");
    for (rank, entry) in result.comparison.ranking.iter().enumerate() {
        let aic = entry
            .aic
            .map(|aic| format!("{:.1}", aic))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {}. {:<8} RMSE {:>7.3}  MAE {:>7.3}  AIC {:>8}  {}",
            rank + 1,
            entry.model,
            entry.rmse,
            entry.mae,
            aic,
            entry.description
        );
    }

    for (model, failure) in &result.failures {
        println!("  {} failed ({}): {}", model, failure.kind, failure.message);
    }

    println!("\nBest by RMSE: {:?}", result.comparison.best_by_rmse);
    println!("Best by MAE:  {:?}", result.comparison.best_by_mae);
    println!("Best by AIC:  {:?}", result.comparison.best_by_aic);
    Ok(())
}
