//! HTTP API: prediction, retraining, model info, health and metrics

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Local};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use surplus_lib::{
    health::components,
    predictor::{round_to, FeatureEncoder, SurplusPredictor, TrainedModel},
    ComponentStatus, HealthRegistry, ModelStore, PredictRequest, PredictionRecord, ServiceMetrics,
    StructuredLogger, MODEL_VERSION,
};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::info;

/// How long a prediction stays valid
pub const PREDICTION_VALIDITY_HOURS: i64 = 24;

/// Shared application state
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    encoder: FeatureEncoder,
    predictor: SurplusPredictor,
}

impl AppState {
    pub fn new(
        store: Arc<ModelStore>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            store,
            health_registry,
            metrics,
            logger,
            encoder: FeatureEncoder::new(),
            predictor: SurplusPredictor::new(),
        }
    }
}

/// Request failures surfaced as a 500 `{error, message}` envelope
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to make prediction")]
    Prediction(String),

    #[error("Failed to retrain model")]
    Training(String),

    #[error("Failed to encode metrics")]
    Metrics(String),
}

impl ApiError {
    fn message(&self) -> &str {
        match self {
            ApiError::Prediction(m) | ApiError::Training(m) | ApiError::Metrics(m) => m,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            message: self.message().to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    pub version: String,
    pub timestamp: chrono::DateTime<Local>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health_registry.health().await)
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionRecord>, ApiError> {
    match run_prediction(&state, &body).await {
        Ok(record) => {
            state.metrics.inc_predictions();
            state.logger.log_prediction(
                &record.prediction_id,
                &record.donor_type,
                record.predicted_quantity_kg,
                record.confidence,
            );
            Ok(Json(record))
        }
        Err(e) => {
            let message = format!("{:#}", e);
            state.metrics.inc_prediction_errors();
            state.logger.log_failure("prediction", &message);
            Err(ApiError::Prediction(message))
        }
    }
}

async fn run_prediction(state: &AppState, body: &[u8]) -> anyhow::Result<PredictionRecord> {
    let request: PredictRequest =
        serde_json::from_slice(body).context("invalid prediction payload")?;

    let resolved = state.encoder.resolve(&request, &Local::now());
    let features = state.encoder.encode(&resolved);

    let model = load_model(state).await?;
    let start = Instant::now();
    let prediction = state.predictor.predict(model.as_ref(), &features);
    state
        .metrics
        .observe_prediction_latency(start.elapsed().as_secs_f64());

    let prediction_date = Local::now();
    Ok(PredictionRecord {
        prediction_id: format!("pred_{}", prediction_date.timestamp()),
        donor_type: resolved.donor_type.clone(),
        predicted_quantity_kg: round_to(prediction.quantity_kg, 2),
        confidence: round_to(prediction.confidence, 3),
        prediction_date,
        valid_until: prediction_date + Duration::hours(PREDICTION_VALIDITY_HOURS),
        model_version: MODEL_VERSION.to_string(),
        features_used: resolved,
    })
}

/// Fetch the live model, keeping the `model_store` component status current
async fn load_model(state: &AppState) -> anyhow::Result<Arc<TrainedModel>> {
    match state.store.get_or_load().await {
        Ok(model) => {
            let recovered = state
                .health_registry
                .component(components::MODEL_STORE)
                .await
                .is_some_and(|c| c.status != ComponentStatus::Healthy);
            if recovered {
                state.health_registry.set_healthy(components::MODEL_STORE).await;
            }
            state.metrics.set_model_loaded(true);
            Ok(model)
        }
        Err(e) => {
            state
                .health_registry
                .set_unhealthy(components::MODEL_STORE, e.to_string())
                .await;
            Err(e.into())
        }
    }
}

async fn train(State(state): State<Arc<AppState>>) -> Result<Json<TrainResponse>, ApiError> {
    info!("Starting model retraining");
    let start = Instant::now();

    match state.store.train_and_replace().await {
        Ok(model) => {
            let elapsed = start.elapsed().as_secs_f64();
            state.metrics.inc_training_runs();
            state.metrics.observe_training_duration(elapsed);
            state.metrics.set_model_loaded(true);
            state.health_registry.set_healthy(components::TRAINER).await;
            state
                .logger
                .log_model_trained(model.forest.n_samples(), elapsed);

            Ok(Json(TrainResponse {
                message: "Model retrained successfully".to_string(),
                version: MODEL_VERSION.to_string(),
                timestamp: Local::now(),
            }))
        }
        Err(e) => {
            let message = e.to_string();
            state.metrics.inc_training_errors();
            state
                .health_registry
                .set_degraded(components::TRAINER, message.clone())
                .await;
            state.logger.log_failure("retraining", &message);
            Err(ApiError::Training(message))
        }
    }
}

async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.model_info().await)
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Metrics(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router; CORS is open to every origin
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/train", post(train))
        .route("/model-info", get(model_info))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
