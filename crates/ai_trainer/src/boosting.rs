//! Gradient-boosted trees under logistic loss

use potability_ai_core::{sigmoid, BoostedTrees, Potability};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Clamp for the prior positive rate before taking log-odds.
const PRIOR_EPS: f64 = 1e-6;
/// Floor on `p(1-p)` so near-certain rows keep a usable hessian.
const MIN_HESSIAN: f64 = 1e-12;

/// Gradient boosting hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) per tree
    pub subsample: f64,
    pub l2_regularization: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 250,
            learning_rate: 0.05,
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 9,
            subsample: 0.75,
            l2_regularization: 1.0,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TrainerError::InvalidConfig(
                "boosting.n_estimators must be > 0".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainerError::InvalidConfig(format!(
                "boosting.learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(TrainerError::InvalidConfig(format!(
                "boosting.subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if self.max_depth == 0 || self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidConfig(
                "boosting.max_depth and boosting.min_samples_leaf must be > 0".to_string(),
            ));
        }
        if !(self.l2_regularization.is_finite() && self.l2_regularization >= 0.0) {
            return Err(TrainerError::InvalidConfig(
                "boosting.l2_regularization must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prior log-odds of the positive class.
pub fn prior_log_odds(labels: &[Potability]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let positives = labels.iter().filter(|&&l| l == Potability::Potable).count();
    let p = (positives as f64 / labels.len() as f64).clamp(PRIOR_EPS, 1.0 - PRIOR_EPS);
    (p / (1.0 - p)).ln()
}

/// Fit boosted trees on already-scaled rows.
pub fn fit_boosted(
    features: &[Vec<f64>],
    labels: &[Potability],
    params: &BoostingParams,
    rng: &mut LcgRng,
) -> Result<BoostedTrees> {
    if features.is_empty() {
        return Err(TrainerError::Training(
            "cannot fit boosted trees on no rows".to_string(),
        ));
    }

    let n = features.len();
    let targets: Vec<f64> = labels.iter().map(|l| l.as_f64()).collect();
    let bias = prior_log_odds(labels);
    let mut raw = vec![bias; n];

    let config = TreeConfig {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
        max_features: None,
        l2_regularization: params.l2_regularization,
    };
    let sample_size = ((params.subsample * n as f64).ceil() as usize).clamp(1, n);

    let mut gradients = vec![0.0; n];
    let mut hessians = vec![0.0; n];
    let mut trees = Vec::with_capacity(params.n_estimators);

    for tree_idx in 0..params.n_estimators {
        for i in 0..n {
            let p = sigmoid(raw[i]);
            gradients[i] = p - targets[i];
            hessians[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
        }

        let rows = if sample_size < n {
            rng.sample_distinct(n, sample_size)
        } else {
            (0..n).collect()
        };

        let builder = CartBuilder::new(features, &gradients, &hessians, config.clone())?;
        let tree = builder.build(&rows, rng);

        for (score, row) in raw.iter_mut().zip(features) {
            *score += params.learning_rate * tree.evaluate(row);
        }

        debug!(
            "boosting tree {}/{}: {} nodes",
            tree_idx + 1,
            params.n_estimators,
            tree.nodes.len()
        );
        trees.push(tree);
    }

    Ok(BoostedTrees::new(bias, params.learning_rate, trees))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_matches_class_balance() {
        let balanced = [Potability::Potable, Potability::NotPotable];
        assert!(prior_log_odds(&balanced).abs() < 1e-12);

        let skewed = [
            Potability::Potable,
            Potability::NotPotable,
            Potability::NotPotable,
            Potability::NotPotable,
        ];
        assert!((prior_log_odds(&skewed) - (1.0f64 / 3.0).ln()).abs() < 1e-12);

        // Single-class data stays finite.
        assert!(prior_log_odds(&[Potability::Potable]).is_finite());
    }

    #[test]
    fn boosting_learns_threshold() -> Result<()> {
        let features: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64 / 10.0]).collect();
        let labels: Vec<Potability> = (0..60)
            .map(|i| if i < 30 { Potability::NotPotable } else { Potability::Potable })
            .collect();

        let params = BoostingParams {
            n_estimators: 30,
            learning_rate: 0.3,
            max_depth: 2,
            min_samples_leaf: 2,
            subsample: 1.0,
            ..BoostingParams::default()
        };

        let model = fit_boosted(&features, &labels, &params, &mut LcgRng::new(42))?;
        assert_eq!(model.trees.len(), 30);
        assert!(model.predict_proba(&[0.5]) < 0.2);
        assert!(model.predict_proba(&[5.5]) > 0.8);
        Ok(())
    }

    #[test]
    fn validate_rejects_bad_learning_rate() {
        let params = BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::default()
        };
        assert!(matches!(params.validate(), Err(TrainerError::InvalidConfig(_))));
        assert!(BoostingParams::default().validate().is_ok());
    }
}
