//! Model training on synthetic donation history
//!
//! Generates a labeled dataset from a fixed linear surplus relationship with
//! Gaussian noise, fits the scaler on raw features and the forest on scaled
//! features.

use super::forest::{ForestConfig, RandomForest};
use super::scaler::StandardScaler;
use crate::error::TrainError;
use crate::models::{DonorType, FeatureVector};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::time::Instant;
use tracing::{debug, info};

/// Weights of the synthetic surplus relationship, in feature order
pub const TARGET_WEIGHTS: [f64; 6] = [10.0, 2.0, 1.5, 0.5, 0.3, 0.8];

/// Standard deviation of the injected target noise (kg)
pub const TARGET_NOISE_STD: f64 = 5.0;

/// Floor applied to every synthetic target (kg)
pub const MIN_TARGET_KG: f64 = 1.0;

/// Training configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Number of synthetic samples to generate
    pub n_samples: usize,
    /// Seed for data generation and bootstrap sampling
    pub seed: u64,
    /// Forest hyperparameters
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Labeled training data
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl SyntheticDataset {
    /// Draw `n` samples deterministically from `seed`
    pub fn generate(n: usize, seed: u64) -> Result<Self, TrainError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise =
            Normal::new(0.0, TARGET_NOISE_STD).map_err(|e| TrainError::Noise(e.to_string()))?;

        let features: Vec<FeatureVector> = (0..n)
            .map(|_| {
                let donor =
                    DonorType::from_code(rng.gen_range(0..4)).unwrap_or(DonorType::Restaurant);
                [
                    donor.code() as f64,
                    rng.gen_range(0..7) as f64,
                    rng.gen_range(1..13) as f64,
                    rng.gen_range(0..24) as f64,
                    rng.gen_range(0..100) as f64,
                    rng.gen_range(5.0..50.0),
                ]
            })
            .collect();

        let targets = features
            .iter()
            .map(|row| (base_surplus(row) + noise.sample(&mut rng)).max(MIN_TARGET_KG))
            .collect();

        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Noise-free surplus for a raw feature row
pub fn base_surplus(row: &FeatureVector) -> f64 {
    row.iter().zip(TARGET_WEIGHTS).map(|(v, w)| v * w).sum()
}

/// A fitted scaler and forest pair
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub forest: RandomForest,
    pub scaler: StandardScaler,
    pub trained_at: DateTime<Local>,
}

/// Fits the surplus model
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Generate data and fit scaler and forest
    pub fn train(&self) -> Result<TrainedModel, TrainError> {
        let start = Instant::now();
        let dataset = SyntheticDataset::generate(self.config.n_samples, self.config.seed)?;
        debug!(samples = dataset.len(), "Generated synthetic training data");

        let scaler = StandardScaler::fit(&dataset.features);
        let scaled = scaler.transform_all(&dataset.features);
        let forest = RandomForest::fit(&scaled, &dataset.targets, self.config.forest)?;

        info!(
            samples = dataset.len(),
            trees = forest.n_trees(),
            max_depth = self.config.forest.max_depth,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model training completed"
        );

        Ok(TrainedModel {
            forest,
            scaler,
            trained_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_default_training_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_samples, 1000);
        assert_eq!(config.seed, 42);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.forest.max_depth, 10);
        assert_eq!(config.forest.seed, 42);
    }

    #[test]
    fn test_dataset_ranges() {
        let data = SyntheticDataset::generate(500, 42).unwrap();
        assert_eq!(data.len(), 500);
        for (row, target) in data.features.iter().zip(&data.targets) {
            assert!((0.0..=3.0).contains(&row[0]));
            assert!((0.0..=6.0).contains(&row[1]));
            assert!((1.0..=12.0).contains(&row[2]));
            assert!((0.0..=23.0).contains(&row[3]));
            assert!((0.0..=99.0).contains(&row[4]));
            assert!(row[5] >= 5.0 && row[5] < 50.0);
            assert!(*target >= MIN_TARGET_KG);
        }
    }

    #[test]
    fn test_dataset_is_deterministic() {
        let a = SyntheticDataset::generate(50, 42).unwrap();
        let b = SyntheticDataset::generate(50, 42).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.targets, b.targets);

        let c = SyntheticDataset::generate(50, 7).unwrap();
        assert_ne!(a.features, c.features);
    }

    #[test]
    fn test_base_surplus_weights() {
        let row = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert!((base_surplus(&row) - 15.1).abs() < 1e-9);
    }

    #[test]
    fn test_train_records_sample_count() {
        let model = Trainer::new(small_config()).train().unwrap();
        assert_eq!(model.forest.n_samples(), 200);
        assert_eq!(model.forest.n_trees(), 10);
        assert_eq!(model.forest.n_features(), 6);
    }

    #[test]
    fn test_trained_model_tracks_relationship() {
        let model = Trainer::new(small_config()).train().unwrap();
        let low = [0.0, 0.0, 1.0, 0.0, 0.0, 5.0];
        let high = [3.0, 6.0, 12.0, 23.0, 99.0, 49.0];
        let p_low = model.forest.predict(&model.scaler.transform(&low));
        let p_high = model.forest.predict(&model.scaler.transform(&high));
        assert!(p_high > p_low, "high {} <= low {}", p_high, p_low);
    }

    #[test]
    fn test_empty_training_rejected() {
        let config = TrainingConfig {
            n_samples: 0,
            ..small_config()
        };
        assert!(matches!(
            Trainer::new(config).train(),
            Err(TrainError::EmptyDataset)
        ));
    }
}
