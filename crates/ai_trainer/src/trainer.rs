//! Soft-voting ensemble trainer
//!
//! Fits the scaler, then a random forest and/or gradient-boosted trees on
//! the scaled rows, and scores the result with training accuracy plus
//! stratified k-fold cross-validation.

use potability_ai_core::{
    EnsembleMember, ModelArtifact, StandardScaler, VotingEnsemble, FEATURE_COUNT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::boosting::{fit_boosted, BoostingParams};
use crate::dataset::Dataset;
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};
use crate::forest::{fit_forest, ForestParams};
use crate::metrics::{accuracy, predict_labels};
use crate::validation::cross_validate;

/// Which members the voting ensemble contains
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Random forest + gradient boosting, equal weight
    #[default]
    Ensemble,
    Forest,
    Boosting,
}

/// Trainer configuration, shared by the baseline and every retrain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub algorithm: Algorithm,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    pub cv_folds: usize,
    pub seed: i64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Ensemble,
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            cv_folds: 5,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(TrainerError::InvalidConfig(format!(
                "cv_folds must be >= 2, got {}",
                self.cv_folds
            )));
        }
        if self.uses_forest() {
            self.forest.validate()?;
        }
        if self.uses_boosting() {
            self.boosting.validate()?;
        }
        Ok(())
    }

    fn uses_forest(&self) -> bool {
        matches!(self.algorithm, Algorithm::Ensemble | Algorithm::Forest)
    }

    fn uses_boosting(&self) -> bool {
        matches!(self.algorithm, Algorithm::Ensemble | Algorithm::Boosting)
    }
}

/// A fitted artifact plus its training-time scores
#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub train_accuracy: f64,
    pub cv_accuracy: f64,
    pub cv_scores: Vec<f64>,
}

/// The classifier-trainer collaborator used by the retraining workflow
pub trait ClassifierTrainer: Send + Sync {
    /// Fit on the full dataset and report train / cross-validated accuracy.
    fn train(&self, dataset: &Dataset) -> Result<TrainedModel>;
}

/// Default trainer: scaler + soft-voting tree ensemble
#[derive(Clone, Debug, Default)]
pub struct EnsembleTrainer {
    config: TrainerConfig,
}

impl EnsembleTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit scaler and ensemble on `dataset`, without evaluation.
    pub fn fit(&self, dataset: &Dataset) -> Result<ModelArtifact> {
        self.fit_seeded(dataset, self.config.seed)
    }

    fn fit_seeded(&self, dataset: &Dataset, seed: i64) -> Result<ModelArtifact> {
        if dataset.is_empty() {
            return Err(TrainerError::Dataset("training set is empty".to_string()));
        }
        if dataset.feature_count() != FEATURE_COUNT {
            return Err(TrainerError::Dataset(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                dataset.feature_count()
            )));
        }

        let scaler = StandardScaler::fit(&dataset.features)?;
        let scaled = scaler.transform(&dataset.features)?;
        let mut rng = LcgRng::new(seed);

        let mut members = Vec::with_capacity(2);
        if self.config.uses_forest() {
            let mut forest_rng = rng.fork(0);
            let forest = fit_forest(&scaled, &dataset.labels, &self.config.forest, &mut forest_rng)?;
            members.push(EnsembleMember::Forest(forest));
        }
        if self.config.uses_boosting() {
            let mut boosting_rng = rng.fork(1);
            let boosted = fit_boosted(
                &scaled,
                &dataset.labels,
                &self.config.boosting,
                &mut boosting_rng,
            )?;
            members.push(EnsembleMember::Boosted(boosted));
        }

        let artifact = ModelArtifact::new(VotingEnsemble::new(FEATURE_COUNT, members), scaler);
        artifact.validate()?;
        Ok(artifact)
    }
}

impl ClassifierTrainer for EnsembleTrainer {
    #[instrument(skip(self, dataset), fields(samples = dataset.len(), algorithm = ?self.config.algorithm))]
    fn train(&self, dataset: &Dataset) -> Result<TrainedModel> {
        self.config.validate()?;

        let [not_potable, potable] = dataset.class_counts();
        info!(
            "training on {} samples ({} potable, {} not potable)",
            dataset.len(),
            potable,
            not_potable
        );

        let artifact = self.fit(dataset)?;
        let predicted = predict_labels(&artifact, &dataset.features)?;
        let train_accuracy = accuracy(&dataset.labels, &predicted);

        // Each fold gets its own seed so folds do not share sampling streams.
        let cv_scores = cross_validate(dataset, self.config.cv_folds, |train, fold| {
            self.fit_seeded(train, self.config.seed.wrapping_add(fold as i64 + 1))
        })?;
        let cv_accuracy = cv_scores.iter().sum::<f64>() / cv_scores.len() as f64;

        debug!(?cv_scores, "cross-validation complete");
        info!(
            "train accuracy {:.4}, cv accuracy {:.4} ({} folds, {} trees)",
            train_accuracy,
            cv_accuracy,
            cv_scores.len(),
            artifact.predictor.tree_count()
        );

        Ok(TrainedModel {
            artifact,
            train_accuracy,
            cv_accuracy,
            cv_scores,
        })
    }
}
