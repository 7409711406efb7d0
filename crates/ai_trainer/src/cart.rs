//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy second-order tree construction shared by both ensemble
//! members. Each row carries a gradient and a hessian; a leaf predicts
//! `-G / (H + lambda)` and a split is scored by
//!
//! ```text
//! gain = GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)
//! ```
//!
//! With `g = -w·y`, `h = w` and `λ = 0` this is weighted variance reduction
//! and the leaf is the weighted positive rate (random forest). With logistic
//! gradients it is a Newton boosting step.

use potability_ai_core::{Node, Tree};

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Gains at or below this are treated as "no improvement".
const MIN_GAIN: f64 = 1e-12;

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled per split; `None` considers all of them
    pub max_features: Option<usize>,
    pub l2_regularization: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            l2_regularization: 0.0,
        }
    }
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Build a tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Result<Self> {
        if features.len() != gradients.len() || features.len() != hessians.len() {
            return Err(TrainerError::Training(format!(
                "row/gradient/hessian length mismatch: {}/{}/{}",
                features.len(),
                gradients.len(),
                hessians.len()
            )));
        }

        let feature_count = features.first().map_or(0, Vec::len);
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(TrainerError::Training("ragged feature matrix".to_string()));
        }

        Ok(Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        })
    }

    /// Build a tree over the given rows.
    ///
    /// `indices` may repeat rows (bootstrap samples). Nodes are laid out in
    /// pre-order so every child index is greater than its parent's.
    pub fn build(&self, indices: &[usize], rng: &mut LcgRng) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes, rng);
        Tree::new(nodes)
    }

    /// Recursively build tree nodes, returning the index of the new node
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut LcgRng,
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let (sum_g, sum_h) = self.sum_gradients_hessians(indices);

        let splittable = depth < self.config.max_depth
            && indices.len() >= self.config.min_samples_split.max(2)
            && indices.len() >= 2 * self.config.min_samples_leaf.max(1);

        let split = if splittable {
            self.find_best_split(indices, sum_g, sum_h, rng)
        } else {
            None
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, self.leaf_value(sum_g, sum_h)));
            return current_idx;
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve the slot; children are patched in once built.
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left = self.build_node(&left_indices, depth + 1, nodes, rng);
        let right = self.build_node(&right_indices, depth + 1, nodes, rng);

        let node = &mut nodes[current_idx as usize];
        node.left = left;
        node.right = right;

        current_idx
    }

    /// Sort-and-sweep over each candidate feature
    fn find_best_split(
        &self,
        indices: &[usize],
        sum_g: f64,
        sum_h: f64,
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let parent_score = self.score(sum_g, sum_h);
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;

        let candidates = match self.config.max_features {
            Some(k) if k < self.feature_count => rng.sample_distinct(self.feature_count, k.max(1)),
            _ => (0..self.feature_count).collect(),
        };

        let mut sorted = indices.to_vec();
        for feature_idx in candidates {
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for pos in 0..sorted.len() - 1 {
                let row = sorted[pos];
                g_left += self.gradients[row];
                h_left += self.hessians[row];

                let n_left = pos + 1;
                if n_left < min_leaf {
                    continue;
                }
                if sorted.len() - n_left < min_leaf {
                    break;
                }

                let here = self.features[row][feature_idx];
                let next = self.features[sorted[pos + 1]][feature_idx];
                if here == next {
                    continue;
                }

                let gain = self.score(g_left, h_left)
                    + self.score(sum_g - g_left, sum_h - h_left)
                    - parent_score;

                // Strict comparison keeps the lowest feature, then lowest threshold.
                if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: midpoint(here, next),
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&idx| self.features[idx][feature_idx] <= threshold)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.l2_regularization;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    /// Sum gradients and hessians for a set of samples
    fn sum_gradients_hessians(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &idx| {
            (g + self.gradients[idx], h + self.hessians[idx])
        })
    }

    /// Optimal leaf value: -G/(H+λ)
    fn leaf_value(&self, sum_g: f64, sum_h: f64) -> f64 {
        let denom = sum_h + self.config.l2_regularization;
        if denom > 0.0 {
            -sum_g / denom
        } else {
            0.0
        }
    }
}

/// Threshold between two adjacent sorted values, never equal to `hi`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}
