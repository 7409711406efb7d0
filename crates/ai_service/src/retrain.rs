//! Retraining workflow
//!
//! One labelled sample in, one new registered version out. The artifact is
//! always saved before the record is registered, so a crash can leave an
//! unregistered artifact behind but never a record without one.

use chrono::Utc;
use potability_ai_core::LabeledSample;
use potability_ai_registry::{VersionId, VersionRecord, VersionView};
use potability_ai_trainer::{ClassifierTrainer, Dataset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::errors::{Result, ServiceError};
use crate::state::{ModelState, MutationGuard, RegistryChange};

/// When a freshly registered version becomes current
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// Every new version is promoted
    #[default]
    Always,
    /// Keep the current version when the new one's cross-validated accuracy
    /// falls more than `tolerance` below it
    NoRegression { tolerance: f64 },
}

impl PromotionPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            PromotionPolicy::Always => Ok(()),
            PromotionPolicy::NoRegression { tolerance }
                if tolerance.is_finite() && tolerance >= 0.0 =>
            {
                Ok(())
            }
            PromotionPolicy::NoRegression { tolerance } => Err(ServiceError::Config(format!(
                "promotion tolerance must be a non-negative number, got {tolerance}"
            ))),
        }
    }

    pub fn should_promote(&self, current_cv: f64, candidate_cv: f64) -> bool {
        match *self {
            PromotionPolicy::Always => true,
            PromotionPolicy::NoRegression { tolerance } => candidate_cv + tolerance >= current_cv,
        }
    }
}

/// Result of one retrain call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainOutcome {
    #[serde(flatten)]
    pub version: VersionView,
    /// Whether the new version was made current
    pub promoted: bool,
    /// Version that was current when the retrain started
    pub previous_version: VersionId,
    /// Per-fold accuracies behind `cv_accuracy`
    pub cv_scores: Vec<f64>,
}

/// Appends a sample, retrains on base + incremental data and registers the
/// result.
pub struct RetrainingWorkflow {
    state: Arc<ModelState>,
    trainer: Arc<dyn ClassifierTrainer>,
    base_dataset: PathBuf,
    policy: PromotionPolicy,
}

impl RetrainingWorkflow {
    pub fn new(
        state: Arc<ModelState>,
        trainer: Arc<dyn ClassifierTrainer>,
        base_dataset: impl Into<PathBuf>,
        policy: PromotionPolicy,
    ) -> Self {
        Self {
            state,
            trainer,
            base_dataset: base_dataset.into(),
            policy,
        }
    }

    pub fn base_dataset(&self) -> &Path {
        &self.base_dataset
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    /// Run the full workflow under the mutation lock.
    ///
    /// Fails with `RetrainInProgress` instead of waiting when another
    /// mutation holds the lock.
    #[instrument(skip_all, fields(label = %sample.label))]
    pub fn retrain(&self, sample: &LabeledSample) -> Result<RetrainOutcome> {
        let guard = self.state.try_begin_mutation()?;
        let started = Instant::now();

        let result = self.retrain_locked(&guard, sample);

        let elapsed = started.elapsed().as_millis() as u64;
        self.state.metrics().record_retrain(result.is_ok(), elapsed);
        match &result {
            Ok(outcome) => info!(
                "retrain finished in {} ms: {} (promoted: {})",
                elapsed, outcome.version.record.version_id, outcome.promoted
            ),
            Err(e) => warn!("retrain failed after {} ms: {}", elapsed, e),
        }
        result
    }

    fn retrain_locked(
        &self,
        guard: &MutationGuard<'_>,
        sample: &LabeledSample,
    ) -> Result<RetrainOutcome> {
        self.state.incremental().append(sample)?;

        let mut dataset = Dataset::from_csv(&self.base_dataset)?;
        let incremental = self.state.incremental().load()?;
        dataset.extend_samples(&incremental);
        info!(
            "training on {} samples ({} incremental)",
            dataset.len(),
            incremental.len()
        );

        let trained = self.trainer.train(&dataset)?;

        let registry = self.state.registry_snapshot();
        let previous = registry.get_current()?.clone();
        let previous_count = registry
            .latest()
            .map_or(0, |latest| latest.training_sample_count);
        let version_id = registry.next_version_id();

        let artifact_hash = self.state.store().save(version_id, &trained.artifact)?;

        let added = dataset.len().saturating_sub(previous_count);
        let record = VersionRecord {
            version_id,
            created_at: Utc::now(),
            training_sample_count: dataset.len(),
            incremental_sample_count: added,
            train_accuracy: trained.train_accuracy,
            cv_accuracy: trained.cv_accuracy,
            description: format!(
                "Retrained with {} new sample(s), {} total",
                added,
                dataset.len()
            ),
            artifact_hash,
        };

        if let Err(e) = self
            .state
            .mutate_registry(guard, RegistryChange::Add(version_id), |reg| {
                reg.add_version(record.clone())
            })
        {
            // Unregistered, so nothing refers to it. A leftover is overwritten
            // by the next attempt or removed by orphan collection.
            if let Err(cleanup) = self.state.store().remove(version_id) {
                warn!("could not remove unregistered artifact {}: {}", version_id, cleanup);
            }
            return Err(e);
        }

        let promoted = self
            .policy
            .should_promote(previous.cv_accuracy, record.cv_accuracy);
        if promoted {
            self.state
                .mutate_registry(guard, RegistryChange::Switch(version_id), |reg| {
                    reg.switch_current(version_id)
                })
                .map_err(|e| match e {
                    ServiceError::Registry(source) => ServiceError::PromotionFailed {
                        version: version_id,
                        source,
                    },
                    other => other,
                })?;
            self.state.metrics().record_switch();
        } else {
            info!(
                "kept {} current: {} cv accuracy {:.4} regressed from {:.4}",
                previous.version_id, version_id, record.cv_accuracy, previous.cv_accuracy
            );
        }

        Ok(RetrainOutcome {
            version: VersionView {
                record,
                is_current: promoted,
            },
            promoted,
            previous_version: previous.version_id,
            cv_scores: trained.cv_scores,
        })
    }
}
