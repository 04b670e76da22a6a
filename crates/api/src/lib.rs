//! LACTEVA Prediction Service
//!
//! HTTP front end over a model bundle loaded once at startup.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use inference_engine::ModelService;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use storage::ModelRegistry;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod routes;

pub use config::{load_pipeline_config, LogConfig, ServiceConfig};
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub service: ModelService,
    /// Prometheus exporter, when installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
}

impl AppState {
    pub fn new(service: ModelService, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            service,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::status::root))
        .route("/health", get(routes::status::health))
        .route("/predict", post(routes::predictions::predict))
        .route("/model-info", get(routes::status::model_info))
        .route("/metrics", get(routes::status::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let level: Level = config
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", config.level))?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("failed to set tracing subscriber")
}

/// Load the model and serve until the listener fails
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let metrics = if config.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let service = ModelService::load(&ModelRegistry::new(config.model_dir.clone()));
    let state = Arc::new(AppState::new(service, metrics));
    let app = create_router(state);

    info!("Starting API server on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}
