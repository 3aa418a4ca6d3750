//! HTTP error responses

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forecast_core::ForecastError;
use thiserror::Error;

/// Errors returned by the API, rendered as `{"error": ..., "kind": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Malformed request body or query
    #[error("{0}")]
    BadRequest(String),

    /// Nothing has been loaded yet
    #[error("{0}")]
    NotFound(String),

    /// The market data provider failed or returned nothing usable
    #[error("Market data error: {0}")]
    Market(String),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forecast(err) => match err {
                ForecastError::InvalidConfig(_) | ForecastError::Data(_) => StatusCode::BAD_REQUEST,
                // Polars errors come from parsing uploaded files
                ForecastError::Polars(_) => StatusCode::BAD_REQUEST,
                ForecastError::Fit(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ForecastError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ForecastError::AllModelsFailed(_) | ForecastError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Market(_) => StatusCode::BAD_GATEWAY,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Forecast(err) => err.kind(),
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Market(_) => "market",
            ApiError::Task(_) => "internal",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ForecastError::InvalidConfig("p".into()), StatusCode::BAD_REQUEST),
            (ForecastError::Data("empty".into()), StatusCode::BAD_REQUEST),
            (ForecastError::Fit("singular".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ForecastError::Timeout {
                    model: "sarima".into(),
                    budget: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ForecastError::AllModelsFailed("all".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::NotFound("none".into()).status(), StatusCode::NOT_FOUND);
    }
}
