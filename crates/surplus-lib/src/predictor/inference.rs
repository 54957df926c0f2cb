//! Surplus inference with a fitted scaler/forest pair
//!
//! The confidence score is a bounded pseudo-random value and does not depend
//! on the input or the forest.

use super::trainer::TrainedModel;
use super::SurplusModel;
use crate::models::{FeatureVector, Prediction};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Smallest quantity ever reported (kg)
pub const MIN_PREDICTION_KG: f64 = 0.1;

/// Lower bound of the confidence score
pub const CONFIDENCE_BASE: f64 = 0.7;

/// Width of the random confidence band
pub const CONFIDENCE_SPREAD: f64 = 0.25;

/// Upper bound of the confidence score
pub const CONFIDENCE_CAP: f64 = 0.95;

impl SurplusModel for TrainedModel {
    fn estimate(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(features);
        self.forest.predict(&scaled)
    }
}

/// Turns model estimates into reported predictions
#[derive(Debug, Default, Clone, Copy)]
pub struct SurplusPredictor;

impl SurplusPredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict<M>(&self, model: &M, features: &FeatureVector) -> Prediction
    where
        M: SurplusModel + ?Sized,
    {
        let start = Instant::now();
        let quantity_kg = model.estimate(features).max(MIN_PREDICTION_KG);
        let confidence = sample_confidence(&mut rand::thread_rng());

        debug!(
            elapsed_us = start.elapsed().as_micros() as u64,
            quantity_kg,
            confidence,
            "Inference completed"
        );

        Prediction {
            quantity_kg,
            confidence,
        }
    }
}

/// Draw a confidence score in `[CONFIDENCE_BASE, CONFIDENCE_CAP]`
pub fn sample_confidence<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (CONFIDENCE_BASE + rng.gen_range(0.0..CONFIDENCE_SPREAD)).min(CONFIDENCE_CAP)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
