//! Surplus prediction engine

mod features;
mod forest;
mod inference;
mod scaler;
mod trainer;

pub use features::{
    FeatureEncoder, DEFAULT_AVG_DONATION_SIZE, DEFAULT_DONOR_TYPE, DEFAULT_PREVIOUS_DONATIONS,
};
pub use forest::{ForestConfig, RandomForest, RegressionTree};
pub use inference::{
    round_to, sample_confidence, SurplusPredictor, CONFIDENCE_BASE, CONFIDENCE_CAP,
    MIN_PREDICTION_KG,
};
pub use scaler::StandardScaler;
pub use trainer::{
    base_surplus, SyntheticDataset, TrainedModel, Trainer, TrainingConfig, MIN_TARGET_KG,
};

use crate::models::FeatureVector;

/// A fitted model mapping raw features to a surplus estimate in kg
pub trait SurplusModel: Send + Sync {
    fn estimate(&self, features: &FeatureVector) -> f64;
}
