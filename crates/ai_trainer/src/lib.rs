//! Potability AI Trainer - deterministic ensemble trainer
//!
//! Trains the soft-voting classifier (random forest + gradient-boosted
//! trees behind a standard scaler) used by every model version, with
//! stratified cross-validation so accuracy is comparable across versions.

pub mod boosting;
pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod metrics;
pub mod trainer;
pub mod validation;

use std::path::Path;

pub use boosting::BoostingParams;
pub use dataset::{Dataset, FeatureStats};
pub use deterministic::LcgRng;
pub use errors::{Result, TrainerError};
pub use forest::{ClassWeight, ForestParams, MaxFeatures};
pub use metrics::{evaluate, ConfusionMatrix, EvaluationReport};
pub use trainer::{Algorithm, ClassifierTrainer, EnsembleTrainer, TrainedModel, TrainerConfig};

/// Train a model directly from a CSV file using the provided configuration.
pub fn train_model_from_csv(path: &Path, config: TrainerConfig) -> Result<TrainedModel> {
    let dataset = Dataset::from_csv(path)?;
    EnsembleTrainer::new(config).train(&dataset)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
