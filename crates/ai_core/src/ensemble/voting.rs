//! Ensemble members and soft voting
//!
//! Every member maps a scaled row to P(potable); the voting ensemble
//! averages those probabilities with equal weight.

use super::tree::Tree;
use crate::errors::{AiCoreError, Result};
use crate::model::Predictor;
use serde::{Deserialize, Serialize};

/// Bagged trees whose leaves hold the (weighted) positive-class rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(row)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }
}

/// Gradient-boosted trees under logistic loss.
///
/// `raw = bias + learning_rate * Σ leaf`, probability = sigmoid(raw).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoostedTrees {
    /// Prior log-odds
    pub bias: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

impl BoostedTrees {
    pub fn new(bias: f64, learning_rate: f64, trees: Vec<Tree>) -> Self {
        Self {
            bias,
            learning_rate,
            trees,
        }
    }

    /// Log-odds before the sigmoid.
    pub fn raw_score(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(row)).sum();
        self.bias + self.learning_rate * sum
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.raw_score(row))
    }
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// One voter in the ensemble.
///
/// Externally tagged: the predictor blob is bincode, which cannot decode
/// internally tagged enums.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMember {
    Forest(RandomForest),
    Boosted(BoostedTrees),
}

impl EnsembleMember {
    pub fn name(&self) -> &'static str {
        match self {
            EnsembleMember::Forest(_) => "random_forest",
            EnsembleMember::Boosted(_) => "gradient_boosting",
        }
    }

    pub fn trees(&self) -> &[Tree] {
        match self {
            EnsembleMember::Forest(f) => &f.trees,
            EnsembleMember::Boosted(b) => &b.trees,
        }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        match self {
            EnsembleMember::Forest(f) => f.predict_proba(row),
            EnsembleMember::Boosted(b) => b.predict_proba(row),
        }
    }
}

/// Soft-voting classifier over heterogeneous tree ensembles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingEnsemble {
    pub feature_count: usize,
    pub members: Vec<EnsembleMember>,
}

impl VotingEnsemble {
    pub fn new(feature_count: usize, members: Vec<EnsembleMember>) -> Self {
        Self {
            feature_count,
            members,
        }
    }

    /// Structural validation of every member.
    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(AiCoreError::ValidationFailed(
                "ensemble has no members".to_string(),
            ));
        }

        for member in &self.members {
            if let EnsembleMember::Boosted(b) = member {
                if !b.bias.is_finite() || !b.learning_rate.is_finite() {
                    return Err(AiCoreError::ValidationFailed(format!(
                        "{} has non-finite parameters",
                        member.name()
                    )));
                }
            }
            for (i, tree) in member.trees().iter().enumerate() {
                tree.validate(self.feature_count).map_err(|e| {
                    AiCoreError::ValidationFailed(format!(
                        "{} tree {} validation failed: {}",
                        member.name(),
                        i,
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Total number of trees across members.
    pub fn tree_count(&self) -> usize {
        self.members.iter().map(|m| m.trees().len()).sum()
    }

    /// Member names, in voting order.
    pub fn member_names(&self) -> Vec<&'static str> {
        self.members.iter().map(EnsembleMember::name).collect()
    }
}

impl Predictor for VotingEnsemble {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.members.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.members.iter().map(|m| m.predict_proba(row)).sum();
        sum / self.members.len() as f64
    }
}
