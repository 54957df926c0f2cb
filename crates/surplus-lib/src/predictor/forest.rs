//! Random forest regressor
//!
//! Bagged CART regression trees split on variance reduction. Every split
//! considers all features; the forest prediction is the mean over trees.

use crate::error::TrainError;
use crate::models::{FeatureVector, NUM_FEATURES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyperparameters of the forest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Single regression tree stored as a flat node arena; the root is node 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Fit on the rows selected by `indices`
    fn fit(x: &[FeatureVector], y: &[f64], indices: Vec<usize>, config: &ForestConfig) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, indices, 0, config);
        tree
    }

    fn grow(
        &mut self,
        x: &[FeatureVector],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        config: &ForestConfig,
    ) -> usize {
        let id = self.nodes.len();
        let value = mean(y, &indices);
        self.nodes.push(Node::Leaf { value });

        if depth >= config.max_depth || indices.len() < config.min_samples_split.max(2) {
            return id;
        }

        let Some(split) = best_split(x, y, &indices) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.grow(x, y, left_idx, depth + 1, config);
        let right = self.grow(x, y, right_idx, depth + 1, config);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn mean(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Exhaustive search for the split with the lowest summed squared error
fn best_split(x: &[FeatureVector], y: &[f64], indices: &[usize]) -> Option<SplitCandidate> {
    let n = indices.len() as f64;
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n;
    if parent_sse <= f64::EPSILON {
        return None;
    }

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = indices.to_vec();

    for feature in 0..NUM_FEATURES {
        sorted.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..sorted.len() - 1 {
            let yi = y[sorted[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let current = x[sorted[k]][feature];
            let next = x[sorted[k + 1]][feature];
            if next <= current {
                continue;
            }

            let left_n = (k + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (current + next) / 2.0,
                    sse,
                });
            }
        }
    }

    best.filter(|b| b.sse < parent_sse)
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    n_features: usize,
    n_samples: usize,
}

impl RandomForest {
    /// Fit with bootstrap resampling; deterministic for a given seed
    pub fn fit(x: &[FeatureVector], y: &[f64], config: ForestConfig) -> Result<Self, TrainError> {
        if x.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(TrainError::LengthMismatch {
                features: x.len(),
                targets: y.len(),
            });
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, bootstrap, &config)
            })
            .collect();

        Ok(Self {
            config,
            trees,
            n_features: NUM_FEATURES,
            n_samples: n,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}
