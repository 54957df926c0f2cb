//! Observability for the prediction service
//!
//! Provides:
//! - Prometheus metrics (inference latency, training duration, request counters)
//! - Structured JSON logging events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Histogram buckets for inference latency (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Histogram buckets for training duration (seconds)
const TRAINING_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    training_runs_total: IntCounter,
    training_errors_total: IntCounter,
    model_loaded: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "surplus_prediction_latency_seconds",
                "Time spent scaling features and running the forest for one prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_duration_seconds: register_histogram!(
                "surplus_training_duration_seconds",
                "Time spent generating data, fitting and persisting the model",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            predictions_total: register_int_counter!(
                "surplus_predictions_total",
                "Total number of surplus predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "surplus_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            training_runs_total: register_int_counter!(
                "surplus_training_runs_total",
                "Total number of completed training runs"
            )
            .expect("Failed to register training_runs_total"),

            training_errors_total: register_int_counter!(
                "surplus_training_errors_total",
                "Total number of failed training runs"
            )
            .expect("Failed to register training_errors_total"),

            model_loaded: register_int_gauge!(
                "surplus_model_loaded",
                "1 when a scaler/forest pair is live"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same registered collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_training_duration(&self, duration_secs: f64) {
        self.inner().training_duration_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn inc_training_runs(&self) {
        self.inner().training_runs_total.inc();
    }

    pub fn inc_training_errors(&self) {
        self.inner().training_errors_total.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Named service events in a consistent field layout
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = %model_version,
            port = port,
            "Surplus prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Surplus prediction service shutting down"
        );
    }

    pub fn log_model_ready(&self, training_samples: usize, trees: usize) {
        info!(
            event = "model_loaded",
            service = %self.service,
            training_samples = training_samples,
            trees = trees,
            "Model ready for predictions"
        );
    }

    pub fn log_model_trained(&self, training_samples: usize, elapsed_secs: f64) {
        info!(
            event = "model_trained",
            service = %self.service,
            training_samples = training_samples,
            elapsed_secs = elapsed_secs,
            "Model retrained successfully"
        );
    }

    pub fn log_prediction(
        &self,
        prediction_id: &str,
        donor_type: &str,
        quantity_kg: f64,
        confidence: f64,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            prediction_id = %prediction_id,
            donor_type = %donor_type,
            predicted_quantity_kg = quantity_kg,
            confidence = confidence,
            "Prediction made: {:.2} kg with confidence {:.3}",
            quantity_kg,
            confidence
        );
    }

    pub fn log_failure(&self, operation: &str, message: &str) {
        error!(
            event = "request_failed",
            service = %self.service,
            operation = %operation,
            error = %message,
            "Error during {}",
            operation
        );
    }
}
