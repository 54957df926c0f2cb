//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::DateTime;
use std::sync::Arc;
use surplus_lib::{
    health::{components, HealthRegistry, SERVICE_NAME},
    predictor::{ForestConfig, TrainingConfig},
    ModelStore, ServiceMetrics, StructuredLogger, MODEL_VERSION,
};
use surplus_service::api::{create_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

fn small_config() -> TrainingConfig {
    TrainingConfig {
        n_samples: 200,
        seed: 42,
        forest: ForestConfig {
            n_trees: 10,
            ..Default::default()
        },
    }
}

async fn setup_test_app(dir: &TempDir) -> Arc<AppState> {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_STORE).await;
    health_registry.register(components::TRAINER).await;

    let store = Arc::new(ModelStore::new(dir.path().join("models"), small_config()));
    Arc::new(AppState::new(
        store,
        health_registry,
        ServiceMetrics::new(),
        StructuredLogger::new(SERVICE_NAME),
    ))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_payload() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(create_router(state), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], SERVICE_NAME);
    assert_eq!(body["version"], MODEL_VERSION);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_predict_full_payload() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;
    state.store.load_or_train().await.unwrap();

    let payload = r#"{"donor_type":"RESTAURANT","day_of_week":1,"month":6,"hour":10,
        "previous_donations":5,"avg_donation_size":12.0}"#;
    let (status, body) = send(create_router(state), post_json("/predict", payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor_type"], "RESTAURANT");
    assert_eq!(body["model_version"], MODEL_VERSION);
    assert!(body["predicted_quantity_kg"].as_f64().unwrap() > 0.0);

    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.7..=0.95).contains(&confidence), "confidence {}", confidence);

    let id = body["prediction_id"].as_str().unwrap();
    assert!(id.starts_with("pred_"));
    assert!(id["pred_".len()..].parse::<i64>().is_ok());

    let features = &body["features_used"];
    assert_eq!(features["day_of_week"], 1);
    assert_eq!(features["month"], 6);
    assert_eq!(features["hour"], 10);
    assert_eq!(features["previous_donations"], 5);
    assert_eq!(features["avg_donation_size"], 12.0);
}

#[tokio::test]
async fn test_valid_until_is_one_day_later() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(create_router(state), post_json("/predict", "{}")).await;
    assert_eq!(status, StatusCode::OK);

    let predicted =
        DateTime::parse_from_rfc3339(body["prediction_date"].as_str().unwrap()).unwrap();
    let valid = DateTime::parse_from_rfc3339(body["valid_until"].as_str().unwrap()).unwrap();
    assert_eq!(valid - predicted, chrono::Duration::hours(24));
}

#[tokio::test]
async fn test_predict_unknown_donor_type_uses_default_code() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(
        create_router(state),
        post_json("/predict", r#"{"donor_type":"unknown"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor_type"], "unknown");
    assert_eq!(body["features_used"]["donor_type"], "unknown");
    assert_eq!(body["features_used"]["previous_donations"], 0);
    assert_eq!(body["features_used"]["avg_donation_size"], 10.0);
}

#[tokio::test]
async fn test_predict_trains_lazily_when_no_model() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;
    assert!(state.store.current().await.is_none());

    let (status, body) = send(create_router(state.clone()), post_json("/predict", "{}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor_type"], "RESTAURANT");
    assert!(state.store.current().await.is_some());
}

#[tokio::test]
async fn test_predict_accepts_float_numeric_fields() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let payload = r#"{"donor_type":"EVENT","day_of_week":2.0,"month":7,"hour":10.0,
        "previous_donations":3.0,"avg_donation_size":8}"#;
    let (status, body) = send(create_router(state), post_json("/predict", payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_quantity_kg"].as_f64().unwrap() > 0.0);

    let features = &body["features_used"];
    assert_eq!(features["hour"], 10.0);
    assert!(features["hour"].is_f64());
    assert_eq!(features["day_of_week"], 2.0);
    assert_eq!(features["month"], 7);
    assert!(features["month"].is_u64());
    assert_eq!(features["previous_donations"], 3.0);
    assert_eq!(features["avg_donation_size"], 8.0);
}

#[tokio::test]
async fn test_predict_reports_store_failure_in_health() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;
    state.health_registry.set_ready(true).await;

    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    std::fs::write(state.store.model_path(), b"corrupt").unwrap();

    let (status, body) = send(create_router(state.clone()), post_json("/predict", "{}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to make prediction");

    let (_, health) = send(create_router(state.clone()), get("/health")).await;
    assert_eq!(health["status"], "unhealthy");
    let (status, ready) = send(create_router(state.clone()), get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["reason"], "Critical component unhealthy");

    // A missing artifact triggers training, which restores the component
    std::fs::remove_file(state.store.model_path()).unwrap();
    let (status, _) = send(create_router(state.clone()), post_json("/predict", "{}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, health) = send(create_router(state), get("/health")).await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_train_and_predict() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;
    state.store.load_or_train().await.unwrap();
    let app = create_router(state);

    let mut handles = Vec::new();
    for i in 0..3 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, body) = send(app, post_json("/train", "")).await;
            (format!("train-{}", i), status, body)
        }));
    }
    for i in 0..24 {
        let app = app.clone();
        let payload = format!(r#"{{"donor_type":"HOSTEL","hour":{}}}"#, i % 24);
        handles.push(tokio::spawn(async move {
            let (status, body) = send(app, post_json("/predict", &payload)).await;
            (format!("predict-{}", i), status, body)
        }));
    }

    for handle in handles {
        let (name, status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{} returned {}", name, body);
        if name.starts_with("predict") {
            assert!(body["predicted_quantity_kg"].as_f64().unwrap() > 0.0);
        }
    }
}

#[tokio::test]
async fn test_predict_malformed_body_returns_500() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(create_router(state), post_json("/predict", "{not json")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to make prediction");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_predict_wrong_field_type_returns_500() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(
        create_router(state),
        post_json("/predict", r#"{"hour":"noon"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to make prediction");
}

#[tokio::test]
async fn test_model_info_before_load() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(create_router(state), get("/model-info")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"status": "No model loaded", "version": MODEL_VERSION})
    );
}

#[tokio::test]
async fn test_model_info_after_load() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;
    state.store.load_or_train().await.unwrap();

    let (status, body) = send(create_router(state), get("/model-info")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Model loaded");
    assert_eq!(body["model_type"], "RandomForestRegressor");
    assert_eq!(body["features"], 6);
    assert_eq!(body["training_samples"], 200);
    assert!(body["last_updated"].is_string());
}

#[tokio::test]
async fn test_train_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    for _ in 0..2 {
        let (status, body) = send(create_router(state.clone()), post_json("/train", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Model retrained successfully");
        assert_eq!(body["version"], MODEL_VERSION);
        assert!(body["timestamp"].is_string());
    }

    assert!(state.store.model_path().exists());
    assert!(state.store.scaler_path().exists());
    assert!(state.store.current().await.is_some());
}

#[tokio::test]
async fn test_readyz_reflects_registry() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let (status, body) = send(create_router(state.clone()), get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, body) = send(create_router(state), get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let response = create_router(state).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("surplus_predictions_total"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let dir = TempDir::new().unwrap();
    let state = setup_test_app(&dir).await;

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://dashboard.example")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
