//! Per-feature standardization fit once at training time

use crate::models::{FeatureVector, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance transform over the six model features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
}

impl StandardScaler {
    /// Fit on raw training rows (population variance).
    ///
    /// Columns with zero variance keep a scale of 1.0 so they map to 0.
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut mean = [0.0; NUM_FEATURES];
        let mut scale = [1.0; NUM_FEATURES];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let n = rows.len() as f64;
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        for (j, s) in scale.iter_mut().enumerate() {
            let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std > f64::EPSILON {
                *s = std;
            }
        }

        Self { mean, scale }
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; NUM_FEATURES];
        for j in 0..NUM_FEATURES {
            out[j] = (features[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn transform_all(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn mean(&self) -> &[f64; NUM_FEATURES] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; NUM_FEATURES] {
        &self.scale
    }
}
