//! HTTP Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inference_engine::InferenceError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("metrics exporter not installed")]
    MetricsDisabled,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Inference(InferenceError::ServiceUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Inference(InferenceError::MetadataUnavailable) => StatusCode::NOT_FOUND,
            ApiError::Inference(InferenceError::PredictionFailed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MetricsDisabled => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("lacteva_http_errors_total", "status" => status.as_u16().to_string())
            .increment(1);
        // failure details stay in the log
        let detail = match &self {
            ApiError::Inference(InferenceError::PredictionFailed(_)) => {
                "prediction failed".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let unavailable = ApiError::from(InferenceError::ServiceUnavailable("scaler missing".into()));
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(InferenceError::MetadataUnavailable).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(InferenceError::PredictionFailed("nan".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
