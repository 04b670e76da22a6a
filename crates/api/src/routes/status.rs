//! Service Status Routes

use axum::{extract::State, Json};
use inference_engine::{HealthReport, ModelInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Banner returned at `/`
#[derive(Debug, Serialize)]
pub struct ServiceBanner {
    pub service: &'static str,
    pub version: String,
    pub status: &'static str,
    pub models_loaded: BTreeMap<String, bool>,
    pub model_info: Option<ModelInfo>,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceBanner> {
    Json(ServiceBanner {
        service: "LACTEVA ML Service",
        version: state.version.clone(),
        status: "running",
        models_loaded: state.service.health().models_loaded,
        model_info: state.service.model_info().ok(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.service.health())
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>, ApiError> {
    Ok(Json(state.service.model_info()?))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ApiError::MetricsDisabled)
}
