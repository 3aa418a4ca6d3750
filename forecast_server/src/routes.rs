//! API route handlers

use crate::error::{ApiError, ApiResult};
use crate::market::{validate_ticker, Period};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::Utc;
use forecast_core::analysis::{decompose as decompose_series, DecompositionReport};
use forecast_core::loader::{generate_sample, parse_csv_bytes, SampleKind, CSV_LABEL, DEFAULT_SEED};
use forecast_core::request::INLINE_LABEL;
use forecast_core::series::SeriesSummary;
use forecast_core::{
    ForecastError, ForecastOutcome, ForecastRequest, ForecastResult, ModelSelector, Series, SeriesPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// A freshly loaded (or the current) series
#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub ticker: String,
    pub period: Option<String>,
    pub data_points: usize,
    pub dates: Vec<String>,
    pub values: Vec<f64>,
    pub summary: SeriesSummary,
}

impl LoadResponse {
    fn new(series: &Series, period: Option<&str>) -> Self {
        let payload = SeriesPayload::from_series(series);
        Self {
            ticker: series.label().to_string(),
            period: period.map(str::to_string),
            data_points: series.len(),
            dates: payload.dates,
            values: payload.values,
            summary: series.summary(),
        }
    }
}

fn no_data() -> ApiError {
    ApiError::NotFound("No data loaded; load a sample, stock or CSV first".to_string())
}

/// Inline data when present, otherwise the stored series
fn resolve_series(state: &AppState, inline: Option<Series>) -> ApiResult<Arc<Series>> {
    match inline {
        Some(series) => Ok(Arc::new(series)),
        None => state.repository.snapshot().ok_or_else(no_data),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn docs() -> Json<Value> {
    Json(json!({
        "name": "forecast_server",
        "version": env!("CARGO_PKG_VERSION"),
        "models": ["arima", "sarima", "prophet", "compare"],
        "endpoints": {
            "GET /api/health": "Service status and current time",
            "GET /api/docs": "This catalogue",
            "GET /api/load_sample_data": "Generate a sample series (?kind=trend|economic|temperature&seed=42)",
            "POST /api/load_stock_data": "Load daily closes: {ticker, period}",
            "POST /api/load_csv_data": "Upload a CSV as multipart field 'file'",
            "GET /api/series": "The current series with summary statistics",
            "POST /api/forecast": "Run a model or a comparison on inline or stored data",
            "POST /api/decompose": "Additive decomposition: {data?, period?}",
        },
        "forecast_request": {
            "model": "arima | sarima | prophet | compare",
            "data": "optional {dates, values}",
            "forecast_periods": "1..=1000, default 30",
            "confidence_interval": "80..=99, default 95",
            "auto_params": "default true",
            "fast_mode": "default true",
            "manual_params": "{p, d, q}",
            "seasonal_params": "{P, D, Q, period}",
            "additive_params": "yearly/weekly/daily seasonality, changepoints, priors, holidays",
        },
        "periods": crate::market::PERIODS,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

pub async fn load_sample_data(
    State(state): State<AppState>,
    query: Result<Query<SampleQuery>, QueryRejection>,
) -> ApiResult<Json<LoadResponse>> {
    let Query(query) = query?;
    let kind: SampleKind = match query.kind.as_deref() {
        Some(raw) => raw.parse()?,
        None => SampleKind::default(),
    };
    let series = generate_sample(kind, query.seed.unwrap_or(DEFAULT_SEED))?;
    let snapshot = state.repository.replace(series);
    tracing::info!(label = snapshot.label(), points = snapshot.len(), "sample loaded");
    Ok(Json(LoadResponse::new(&snapshot, None)))
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub ticker: String,
    #[serde(default)]
    pub period: Option<String>,
}

pub async fn load_stock_data(
    State(state): State<AppState>,
    body: Result<Json<StockRequest>, JsonRejection>,
) -> ApiResult<Json<LoadResponse>> {
    let Json(request) = body?;
    let ticker = validate_ticker(&request.ticker)?;
    let period: Period = match request.period.as_deref() {
        Some(raw) => raw.parse()?,
        None => Period::default(),
    };
    let series = state.market.daily_closes(&ticker, period).await?;
    let snapshot = state.repository.replace(series);
    tracing::info!(ticker = %ticker, points = snapshot.len(), "stock data loaded");
    Ok(Json(LoadResponse::new(&snapshot, Some(period.as_str()))))
}

pub async fn load_csv_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<LoadResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| ApiError::BadRequest("Multipart field 'file' is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let series = tokio::task::spawn_blocking(move || parse_csv_bytes(bytes.to_vec(), CSV_LABEL)).await??;
    let snapshot = state.repository.replace(series);
    tracing::info!(points = snapshot.len(), "CSV loaded");
    Ok(Json(LoadResponse::new(&snapshot, None)))
}

pub async fn current_series(State(state): State<AppState>) -> ApiResult<Json<LoadResponse>> {
    let snapshot = state.repository.snapshot().ok_or_else(no_data)?;
    Ok(Json(LoadResponse::new(&snapshot, None)))
}

pub async fn forecast(
    State(state): State<AppState>,
    body: Result<Json<ForecastRequest>, JsonRejection>,
) -> ApiResult<Json<ForecastOutcome>> {
    let Json(request) = body?;
    let plan = request.plan()?;
    let series = resolve_series(&state, request.inline_series()?)?;
    let orchestrator = Arc::clone(&state.orchestrator);
    let fallback = state.placeholder_fallback;

    tracing::info!(model = %request.model, points = series.len(), horizon = plan.config.horizon, "forecast requested");
    let outcome = tokio::task::spawn_blocking(move || {
        let result = orchestrator.run(Arc::clone(&series), plan.selector, &plan.config);
        match (result, plan.selector) {
            (Err(err @ (ForecastError::Fit(_) | ForecastError::Timeout { .. })), ModelSelector::Single(kind))
                if fallback =>
            {
                tracing::warn!(model = %kind, error = %err, "serving placeholder forecast");
                ForecastResult::placeholder(kind, &series, plan.config.horizon, plan.config.confidence)
                    .map(ForecastOutcome::Single)
            }
            (result, _) => result,
        }
    })
    .await??;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct DecomposeRequest {
    #[serde(default)]
    pub data: Option<SeriesPayload>,
    #[serde(default)]
    pub period: Option<i64>,
}

pub async fn decompose(
    State(state): State<AppState>,
    body: Result<Json<DecomposeRequest>, JsonRejection>,
) -> ApiResult<Json<DecompositionReport>> {
    let Json(request) = body?;
    let period = request
        .period
        .map(|p| {
            usize::try_from(p).map_err(|_| {
                ForecastError::InvalidConfig(format!("period must be non-negative, got {}", p))
            })
        })
        .transpose()?;
    let inline = request
        .data
        .map(|payload| payload.into_series(INLINE_LABEL))
        .transpose()?;
    let series = resolve_series(&state, inline)?;
    Ok(Json(decompose_series(&series, period)?))
}
