//! Model store: owns the live scaler/forest pair and its on-disk artifacts
//!
//! The pair is replaced wholesale under a write lock, so a retrain never
//! interleaves with a prediction reading the previous pair. Retrains are
//! serialized by a separate mutex.

use crate::error::StoreError;
use crate::models::{ModelInfo, MODEL_VERSION};
use crate::predictor::{RandomForest, StandardScaler, TrainedModel, Trainer, TrainingConfig};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Model artifact file name inside the model directory
pub const MODEL_FILE: &str = "food_surplus_model.json";

/// Scaler artifact file name inside the model directory
pub const SCALER_FILE: &str = "scaler.json";

/// Name reported by `/model-info`
pub const MODEL_TYPE: &str = "RandomForestRegressor";

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    version: String,
    trained_at: DateTime<Local>,
    forest: RandomForest,
}

/// Shared owner of the live model
pub struct ModelStore {
    model_dir: PathBuf,
    trainer: Trainer,
    current: RwLock<Option<Arc<TrainedModel>>>,
    retrain: Mutex<()>,
}

impl ModelStore {
    pub fn new(model_dir: impl Into<PathBuf>, config: TrainingConfig) -> Self {
        Self {
            model_dir: model_dir.into(),
            trainer: Trainer::new(config),
            current: RwLock::new(None),
            retrain: Mutex::new(()),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(SCALER_FILE)
    }

    /// Currently loaded model, if any
    pub async fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().await.clone()
    }

    /// Swap in a new pair; readers holding the old `Arc` finish with it
    pub async fn replace(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let model = Arc::new(model);
        *self.current.write().await = Some(Arc::clone(&model));
        model
    }

    /// Read both artifacts from disk, training and persisting a new pair when
    /// either file is missing. Any other failure is returned unchanged.
    pub async fn load_or_train(self: &Arc<Self>) -> Result<Arc<TrainedModel>, StoreError> {
        let _guard = self.retrain.lock().await;
        self.load_locked().await
    }

    /// Return the live model, loading or training one first if none is set.
    ///
    /// Concurrent first callers share a single load.
    pub async fn get_or_load(self: &Arc<Self>) -> Result<Arc<TrainedModel>, StoreError> {
        if let Some(model) = self.current().await {
            return Ok(model);
        }
        let _guard = self.retrain.lock().await;
        if let Some(model) = self.current().await {
            return Ok(model);
        }
        self.load_locked().await
    }

    /// Caller must hold `retrain`
    async fn load_locked(self: &Arc<Self>) -> Result<Arc<TrainedModel>, StoreError> {
        let store = Arc::clone(self);
        let model = tokio::task::spawn_blocking(move || store.load_or_train_blocking())
            .await
            .map_err(|e| StoreError::Aborted(e.to_string()))??;
        Ok(self.replace(model).await)
    }

    /// Train a fresh pair, persist it and make it live
    pub async fn train_and_replace(self: &Arc<Self>) -> Result<Arc<TrainedModel>, StoreError> {
        let _guard = self.retrain.lock().await;
        let store = Arc::clone(self);
        let model = tokio::task::spawn_blocking(move || store.train_and_persist())
            .await
            .map_err(|e| StoreError::Aborted(e.to_string()))??;
        Ok(self.replace(model).await)
    }

    pub async fn model_info(&self) -> ModelInfo {
        match self.current().await {
            None => ModelInfo::not_loaded(),
            Some(model) => ModelInfo {
                status: "Model loaded".to_string(),
                version: MODEL_VERSION.to_string(),
                model_type: Some(MODEL_TYPE.to_string()),
                features: Some(model.forest.n_features()),
                training_samples: Some(model.forest.n_samples()),
                last_updated: Some(Local::now()),
            },
        }
    }

    fn load_or_train_blocking(&self) -> Result<TrainedModel, StoreError> {
        match self.load_artifacts() {
            Ok(model) => {
                info!(dir = %self.model_dir.display(), "Loaded existing trained model");
                Ok(model)
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    dir = %self.model_dir.display(),
                    "No existing model found, training new model"
                );
                self.train_and_persist()
            }
            Err(e) => Err(e),
        }
    }

    fn train_and_persist(&self) -> Result<TrainedModel, StoreError> {
        let model = self.trainer.train()?;
        self.persist(&model)?;
        info!(dir = %self.model_dir.display(), "Model trained and saved");
        Ok(model)
    }

    /// Read the model and scaler artifacts
    pub fn load_artifacts(&self) -> Result<TrainedModel, StoreError> {
        let artifact: ModelArtifact = read_json(&self.model_path())?;
        let scaler: StandardScaler = read_json(&self.scaler_path())?;
        if artifact.version != MODEL_VERSION {
            warn!(
                artifact_version = %artifact.version,
                expected = MODEL_VERSION,
                "Model artifact was written by a different version"
            );
        }
        Ok(TrainedModel {
            forest: artifact.forest,
            scaler,
            trained_at: artifact.trained_at,
        })
    }

    /// Write both artifacts, creating the model directory if needed
    pub fn persist(&self, model: &TrainedModel) -> Result<(), StoreError> {
        fs::create_dir_all(&self.model_dir).map_err(|source| StoreError::Io {
            path: self.model_dir.clone(),
            source,
        })?;

        let artifact = ModelArtifact {
            version: MODEL_VERSION.to_string(),
            trained_at: model.trained_at,
            forest: model.forest.clone(),
        };
        write_json(&self.model_path(), &artifact)?;
        write_json(&self.scaler_path(), &model.scaler)?;
        Ok(())
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
