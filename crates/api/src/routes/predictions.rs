//! Prediction Routes

use axum::{extract::State, Json};
use inference_engine::{Prediction, PredictionRequest};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Score one feature vector
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<Prediction>, ApiError> {
    let result = state.service.predict(&request)?;
    Ok(Json(result.prediction))
}
