//! Runs adapters against a series snapshot under a wall-clock budget
//!
//! Each adapter runs on its own thread. The caller waits at most the
//! configured budget; on expiry the adapter's [`CancelToken`] is set so a
//! running search stops at the next candidate, and the caller gets
//! [`ForecastError::Timeout`] without waiting for it. Comparison runs start
//! every family at once against the same snapshot and share one deadline.

use crate::config::{ModelConfig, ModelKind, ModelSelector};
use crate::error::{ForecastError, Result};
use crate::models::{adapter_for, CancelToken, ForecastResult, ModelAdapter, TrainingWindow};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn default_budget() -> Duration {
    Duration::from_secs(60)
}

fn default_fast_mode_window() -> usize {
    500
}

/// Orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Wall-clock budget per request
    #[serde(default = "default_budget")]
    pub budget: Duration,
    /// Observations kept when fast mode is on
    #[serde(default = "default_fast_mode_window")]
    pub fast_mode_window: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            fast_mode_window: default_fast_mode_window(),
        }
    }
}

/// Why one family dropped out of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub kind: String,
    pub message: String,
}

impl From<&ForecastError> for FailureReport {
    fn from(err: &ForecastError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// One row of the comparison ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub model: ModelKind,
    pub description: String,
    pub rmse: f64,
    pub mae: f64,
    pub aic: Option<f64>,
}

/// Cross-model summary of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    /// Successful models, best RMSE first
    pub ranking: Vec<RankEntry>,
    pub best_by_rmse: Option<ModelKind>,
    pub best_by_mae: Option<ModelKind>,
    /// Only models with a likelihood take part
    pub best_by_aic: Option<ModelKind>,
}

impl ComparisonSummary {
    pub fn from_results(models: &BTreeMap<ModelKind, ForecastResult>) -> Self {
        let mut ranking: Vec<RankEntry> = models
            .values()
            .map(|r| RankEntry {
                model: r.model,
                description: r.description.clone(),
                rmse: r.metrics.rmse,
                mae: r.metrics.mae,
                aic: r.metrics.aic,
            })
            .collect();
        ranking.sort_by(|a, b| a.rmse.total_cmp(&b.rmse));

        let best_by = |key: fn(&RankEntry) -> Option<f64>| {
            ranking
                .iter()
                .filter_map(|entry| key(entry).map(|value| (entry.model, value)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(model, _)| model)
        };
        let best_by_rmse = best_by(|e| Some(e.rmse));
        let best_by_mae = best_by(|e| Some(e.mae));
        let best_by_aic = best_by(|e| e.aic);

        Self {
            ranking,
            best_by_rmse,
            best_by_mae,
            best_by_aic,
        }
    }
}

/// Result of a comparison run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Always `"compare"`
    pub model: &'static str,
    pub models: BTreeMap<ModelKind, ForecastResult>,
    pub failures: BTreeMap<ModelKind, FailureReport>,
    /// True when at least one family failed
    pub partial: bool,
    pub comparison: ComparisonSummary,
    pub training: TrainingWindow,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastOutcome {
    Single(ForecastResult),
    Comparison(ComparisonResult),
}

/// A spawned adapter run
struct Pending {
    kind: ModelKind,
    receiver: Receiver<Result<ForecastResult>>,
    cancel: CancelToken,
}

/// Dispatches requests to adapters
#[derive(Debug, Clone)]
pub struct Orchestrator {
    adapters: BTreeMap<ModelKind, Arc<dyn ModelAdapter>>,
    settings: OrchestratorSettings,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorSettings::default())
    }
}

impl Orchestrator {
    /// An orchestrator with the built-in adapter for every family
    pub fn new(settings: OrchestratorSettings) -> Self {
        let adapters = ModelKind::ALL
            .iter()
            .map(|&kind| (kind, adapter_for(kind)))
            .collect();
        Self { adapters, settings }
    }

    /// Replace the adapter registered for its family
    pub fn with_adapter(mut self, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run `selector` on `series` under `config`.
    ///
    /// Configuration is validated before any fitting starts. A single
    /// model's error is returned as is; a comparison fails only when every
    /// family fails.
    pub fn run(&self, series: Arc<Series>, selector: ModelSelector, config: &ModelConfig) -> Result<ForecastOutcome> {
        let series = self.training_window(series, config.fast_mode);
        match selector {
            ModelSelector::Single(kind) => {
                if config.kind() != kind {
                    return Err(ForecastError::InvalidConfig(format!(
                        "Requested {} but parameters are for {}",
                        kind,
                        config.kind()
                    )));
                }
                config.validate()?;
                let deadline = self.deadline();
                let pending = self.spawn(kind, Arc::clone(&series), config.clone())?;
                self.wait(pending, deadline).map(ForecastOutcome::Single)
            }
            ModelSelector::Compare => self.compare(series, config).map(ForecastOutcome::Comparison),
        }
    }

    fn compare(&self, series: Arc<Series>, config: &ModelConfig) -> Result<ComparisonResult> {
        let mut failures = BTreeMap::new();
        let mut started = Vec::new();
        let deadline = self.deadline();

        for kind in ModelKind::ALL {
            let model_config = config.for_comparison(kind);
            let spawned = model_config
                .validate()
                .and_then(|_| self.spawn(kind, Arc::clone(&series), model_config));
            match spawned {
                Ok(pending) => started.push(pending),
                Err(err) => {
                    failures.insert(kind, FailureReport::from(&err));
                }
            }
        }

        let mut models = BTreeMap::new();
        for pending in started {
            let kind = pending.kind;
            match self.wait(pending, deadline) {
                Ok(result) => {
                    models.insert(kind, result);
                }
                Err(err) => {
                    tracing::warn!(model = %kind, error = %err, "model dropped from comparison");
                    failures.insert(kind, FailureReport::from(&err));
                }
            }
        }

        if models.is_empty() {
            let reasons = failures
                .iter()
                .map(|(kind, failure)| format!("{}: {}", kind, failure.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ForecastError::AllModelsFailed(reasons));
        }

        tracing::info!(
            succeeded = models.len(),
            failed = failures.len(),
            "comparison finished"
        );
        let comparison = ComparisonSummary::from_results(&models);
        Ok(ComparisonResult {
            model: "compare",
            partial: !failures.is_empty(),
            models,
            failures,
            comparison,
            training: TrainingWindow::of(&series),
        })
    }

    /// The snapshot adapters fit on: the most recent window in fast mode
    fn training_window(&self, series: Arc<Series>, fast_mode: bool) -> Arc<Series> {
        let window = self.settings.fast_mode_window;
        if fast_mode && window > 0 && series.len() > window {
            tracing::debug!(
                observations = series.len(),
                window,
                "fast mode keeps the most recent observations"
            );
            Arc::new(series.tail(window))
        } else {
            series
        }
    }

    fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.settings.budget).unwrap_or(now)
    }

    fn spawn(&self, kind: ModelKind, series: Arc<Series>, config: ModelConfig) -> Result<Pending> {
        let adapter = self.adapters.get(&kind).cloned().ok_or_else(|| {
            ForecastError::InvalidConfig(format!("No adapter registered for {}", kind))
        })?;
        let cancel = CancelToken::with_budget(self.settings.budget);
        let worker_cancel = cancel.clone();
        let (sender, receiver) = mpsc::channel();

        thread::Builder::new()
            .name(format!("fit-{}", kind))
            .spawn(move || {
                let started = Instant::now();
                let result = adapter.fit_and_forecast(&series, &config, &worker_cancel);
                tracing::debug!(
                    model = %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "adapter finished"
                );
                // The receiver is gone once the caller has timed out
                let _ = sender.send(result);
            })?;

        Ok(Pending {
            kind,
            receiver,
            cancel,
        })
    }

    fn wait(&self, pending: Pending, deadline: Instant) -> Result<ForecastResult> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match pending.receiver.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                pending.cancel.cancel();
                tracing::warn!(
                    model = %pending.kind,
                    budget_secs = self.settings.budget.as_secs_f64(),
                    "model exceeded its budget"
                );
                Err(ForecastError::Timeout {
                    model: pending.kind.to_string(),
                    budget: self.settings.budget,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ForecastError::Fit(format!(
                "{} stopped without producing a result",
                pending.kind
            ))),
        }
    }
}
