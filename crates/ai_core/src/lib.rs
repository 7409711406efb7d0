//! Core model types for water potability prediction
//!
//! Provides the data model shared by training, storage and serving:
//! feature vectors and labels, the standard scaler, decision trees and the
//! soft-voting ensemble that turns a scaled feature row into a probability.
//!
//! Modules:
//! - `features`: The 9-dimensional measurement record and its label
//! - `scaler`: Zero-mean / unit-variance feature scaling
//! - `ensemble`: Decision trees, random forest, boosted trees, soft voting
//! - `model`: Predictor + scaler artifact and prediction results
//! - `serde_canon`: Canonical JSON and BLAKE3 artifact hashing

pub mod ensemble;
pub mod errors;
pub mod features;
pub mod model;
pub mod scaler;
pub mod serde_canon;

pub use ensemble::{
    sigmoid, BoostedTrees, EnsembleMember, Node, RandomForest, Tree, VotingEnsemble,
};
pub use errors::{AiCoreError, Result};
pub use features::{
    FeatureVector, LabeledSample, Potability, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN,
};
pub use model::{ModelArtifact, Prediction, Predictor};
pub use scaler::StandardScaler;

/// Crate version string for artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
