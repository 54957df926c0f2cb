//! Error types for training and model persistence

use std::path::PathBuf;
use thiserror::Error;

/// Failures while fitting a model
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyDataset,

    #[error("feature rows ({features}) and targets ({targets}) differ in length")]
    LengthMismatch { features: usize, targets: usize },

    #[error("invalid noise distribution: {0}")]
    Noise(String),
}

/// Failures while loading, persisting or replacing the live model
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode artifact {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode artifact {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("training task aborted: {0}")]
    Aborted(String),
}

impl StoreError {
    /// True when an artifact file does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
