//! Decision tree structures
//!
//! Trees are stored as flat node arrays with node 0 as the root. Leaves hold
//! a single value whose meaning depends on the owning ensemble member (a
//! positive-class rate for forests, a log-odds step for boosted trees).

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the feature row
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the node value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (position in the node array)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Rows with `value <= threshold` go left
    pub threshold: f64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single decision tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on a feature row.
    ///
    /// Malformed structure (dangling child, out-of-range feature) evaluates
    /// to 0.0; `validate` catches those before a model is accepted.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if let Some(value) = node.leaf {
                return value;
            }
            if node.feature_idx < 0 {
                return 0.0;
            }

            let Some(&feature_value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };

            let next = if feature_value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next <= idx as i32 {
                // Children always follow their parent; anything else is a cycle.
                return 0.0;
            }
            idx = next as usize;
        }
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, depth: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => walk(nodes, node.left as usize, depth + 1)
                    .max(walk(nodes, node.right as usize, depth + 1)),
                _ => depth,
            }
        }
        walk(&self.nodes, 0, 0)
    }

    /// Validate tree structure against a feature width.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(v) if v.is_finite() => {}
                    _ => return Err(format!("Leaf {} has no finite value", i)),
                }
                continue;
            }

            if node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Node {} splits on feature {} (width {})",
                    i, node.feature_idx, feature_count
                ));
            }
            if !node.threshold.is_finite() {
                return Err(format!("Node {} has non-finite threshold", i));
            }
            for child in [node.left, node.right] {
                if child <= i as i32 || child >= len {
                    return Err(format!("Node {} has invalid child {}", i, child));
                }
            }
        }

        Ok(())
    }
}
