//! Random forest member
//!
//! Bagged CART trees with per-split feature sampling. Leaves hold the
//! class-weighted positive rate of the rows that reach them.

use potability_ai_core::{Potability, RandomForest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Features considered at each split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, feature_count: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (feature_count as f64).sqrt().floor() as usize,
            MaxFeatures::All => feature_count,
            MaxFeatures::Count(k) => k,
        };
        k.clamp(1, feature_count.max(1))
    }
}

/// Per-class sample weighting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// `w_c = n / (2 * n_c)`
    Balanced,
}

impl ClassWeight {
    /// `[not potable, potable]` weights
    pub fn weights(self, labels: &[Potability]) -> [f64; 2] {
        match self {
            ClassWeight::Uniform => [1.0, 1.0],
            ClassWeight::Balanced => {
                let n = labels.len() as f64;
                let potable = labels.iter().filter(|&&l| l == Potability::Potable).count();
                let counts = [labels.len() - potable, potable];
                counts.map(|c| if c == 0 { 1.0 } else { n / (2.0 * c as f64) })
            }
        }
    }
}

/// Random forest hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub class_weight: ClassWeight,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 250,
            max_depth: 6,
            min_samples_split: 18,
            min_samples_leaf: 9,
            max_features: MaxFeatures::Sqrt,
            class_weight: ClassWeight::Balanced,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TrainerError::InvalidConfig(
                "forest.n_estimators must be > 0".to_string(),
            ));
        }
        if self.max_depth == 0 || self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidConfig(
                "forest.max_depth and forest.min_samples_leaf must be > 0".to_string(),
            ));
        }
        if let MaxFeatures::Count(0) = self.max_features {
            return Err(TrainerError::InvalidConfig(
                "forest.max_features must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fit a forest on already-scaled rows.
pub fn fit_forest(
    features: &[Vec<f64>],
    labels: &[Potability],
    params: &ForestParams,
    rng: &mut LcgRng,
) -> Result<RandomForest> {
    if features.is_empty() {
        return Err(TrainerError::Training("cannot fit forest on no rows".to_string()));
    }

    let weights = params.class_weight.weights(labels);
    let hessians: Vec<f64> = labels.iter().map(|&l| weights[l as usize]).collect();
    let gradients: Vec<f64> = labels
        .iter()
        .zip(&hessians)
        .map(|(&l, &w)| -w * l.as_f64())
        .collect();

    let feature_count = features[0].len();
    let config = TreeConfig {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
        max_features: Some(params.max_features.resolve(feature_count)),
        l2_regularization: 0.0,
    };
    let builder = CartBuilder::new(features, &gradients, &hessians, config)?;

    let n = features.len();
    let all_rows: Vec<usize> = (0..n).collect();
    let mut trees = Vec::with_capacity(params.n_estimators);

    for tree_idx in 0..params.n_estimators {
        let mut tree_rng = rng.fork(tree_idx as u64);
        let rows = if params.bootstrap {
            tree_rng.bootstrap(n, n)
        } else {
            all_rows.clone()
        };
        let tree = builder.build(&rows, &mut tree_rng);
        debug!(
            "forest tree {}/{}: {} nodes",
            tree_idx + 1,
            params.n_estimators,
            tree.nodes.len()
        );
        trees.push(tree);
    }

    Ok(RandomForest::new(trees))
}
