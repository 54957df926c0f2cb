//! Food surplus prediction service
//!
//! Loads (or trains) the surplus model at startup and serves predictions
//! over HTTP.

use anyhow::Result;
use std::sync::Arc;
use surplus_lib::{
    health::{components, HealthRegistry, SERVICE_NAME},
    predictor::TrainingConfig,
    ModelStore, ServiceMetrics, StructuredLogger, MODEL_VERSION,
};
use surplus_service::{api, config};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting surplus prediction service");

    let config = config::ServiceConfig::load()?;
    info!(port = config.port, model_dir = %config.model_dir.display(), "Service configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_STORE).await;
    health_registry.register(components::TRAINER).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    // A load failure other than missing artifacts is fatal
    let store = Arc::new(ModelStore::new(config.model_dir.clone(), TrainingConfig::default()));
    let model = match store.load_or_train().await {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "Failed to load model");
            return Err(e.into());
        }
    };
    metrics.set_model_loaded(true);
    logger.log_model_ready(model.forest.n_samples(), model.forest.n_trees());

    let state = Arc::new(api::AppState::new(
        store,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));
    health_registry.set_ready(true).await;
    logger.log_startup(SERVICE_VERSION, MODEL_VERSION, config.port);

    let shutdown_logger = logger.clone();
    api::serve(&config.bind_addr(), state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
