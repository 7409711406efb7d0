//! Potability service facade
//!
//! The operations the outer request layer calls: prediction, version
//! listing and switching, retraining, plus the maintenance operations used
//! by the CLI.

use chrono::Utc;
use potability_ai_core::{FeatureVector, LabeledSample, Potability};
use potability_ai_registry::{
    ModelStore, RegistryError, VersionId, VersionRecord, VersionRegistry, VersionView,
};
use potability_ai_trainer::{ClassifierTrainer, Dataset, EnsembleTrainer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::ServiceConfig;
use crate::errors::{Result, ServiceError};
use crate::metrics::MetricsSnapshot;
use crate::prediction::{PredictionResponse, PredictionService};
use crate::retrain::{PromotionPolicy, RetrainOutcome, RetrainingWorkflow};
use crate::state::{ModelState, RegistryChange};

/// Result of a consistency check between registry and model store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub healthy: bool,
    pub current_version: VersionId,
    pub versions_checked: usize,
    /// Registered versions without both artifact files
    pub missing_artifacts: Vec<VersionId>,
    /// Registered versions whose artifact no longer matches the recorded hash
    pub hash_mismatches: Vec<VersionId>,
    /// Artifacts without a registry entry
    pub orphan_artifacts: Vec<VersionId>,
    pub issues: Vec<String>,
}

/// Snapshot of the running service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_version: String,
    pub current_version: VersionId,
    pub version_count: usize,
    pub last_allocated: u32,
    pub cached_model: Option<VersionId>,
    pub incremental_samples: usize,
    pub mutation_in_progress: bool,
    pub promotion: PromotionPolicy,
    pub metrics: MetricsSnapshot,
}

/// Version registry, model store, prediction path and retraining workflow
/// behind one handle
pub struct PotabilityService {
    config: ServiceConfig,
    state: Arc<ModelState>,
    predictions: PredictionService,
    workflow: RetrainingWorkflow,
}

impl PotabilityService {
    /// Train the baseline with the configured ensemble trainer.
    pub fn initialize_baseline(config: ServiceConfig) -> Result<Self> {
        let trainer = Arc::new(EnsembleTrainer::new(config.trainer.clone()));
        Self::initialize_baseline_with_trainer(config, trainer)
    }

    /// Train "Original" on the base dataset, save it and create the registry.
    ///
    /// Fails with `AlreadyInitialized` if a registry exists.
    #[instrument(skip_all, fields(models_dir = %config.models_dir.display()))]
    pub fn initialize_baseline_with_trainer(
        config: ServiceConfig,
        trainer: Arc<dyn ClassifierTrainer>,
    ) -> Result<Self> {
        config.validate()?;
        let dir = config.versions_dir();
        if VersionRegistry::exists(&dir) {
            return Err(RegistryError::AlreadyInitialized(VersionRegistry::metadata_path(&dir)).into());
        }

        let dataset = Dataset::from_csv(&config.base_dataset)?;
        info!(
            "training baseline on {} samples from {}",
            dataset.len(),
            config.base_dataset.display()
        );
        let trained = trainer.train(&dataset)?;

        let artifact_hash = ModelStore::new(&dir).save(VersionId::Original, &trained.artifact)?;
        let record = VersionRecord {
            version_id: VersionId::Original,
            created_at: Utc::now(),
            training_sample_count: dataset.len(),
            incremental_sample_count: 0,
            train_accuracy: trained.train_accuracy,
            cv_accuracy: trained.cv_accuracy,
            description: "Baseline model trained on the base dataset".to_string(),
            artifact_hash,
        };
        let registry = VersionRegistry::initialize(&dir, record)?;
        info!(
            "baseline ready: train accuracy {:.4}, cv accuracy {:.4}",
            trained.train_accuracy, trained.cv_accuracy
        );

        let state = ModelState::with_registry(&dir, registry);
        Ok(Self::assemble(config, state, trainer))
    }

    /// Open an initialized models directory with the configured trainer.
    pub fn open(config: ServiceConfig) -> Result<Self> {
        let trainer = Arc::new(EnsembleTrainer::new(config.trainer.clone()));
        Self::open_with_trainer(config, trainer)
    }

    pub fn open_with_trainer(
        config: ServiceConfig,
        trainer: Arc<dyn ClassifierTrainer>,
    ) -> Result<Self> {
        config.validate()?;
        let state = ModelState::open(&config.versions_dir())?;
        Ok(Self::assemble(config, state, trainer))
    }

    fn assemble(
        config: ServiceConfig,
        state: ModelState,
        trainer: Arc<dyn ClassifierTrainer>,
    ) -> Self {
        let state = Arc::new(state);
        let predictions = PredictionService::new(Arc::clone(&state));
        let workflow = RetrainingWorkflow::new(
            Arc::clone(&state),
            trainer,
            config.base_dataset.clone(),
            config.promotion,
        );
        Self {
            config,
            state,
            predictions,
            workflow,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<ModelState> {
        &self.state
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResponse> {
        self.predictions.predict(features)
    }

    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<PredictionResponse>> {
        self.predictions.predict_batch(batch)
    }

    /// Every version in creation order, with the current one flagged
    pub fn list_versions(&self) -> Vec<VersionView> {
        self.state.read_registry(VersionRegistry::list_views)
    }

    pub fn current_version(&self) -> Result<VersionView> {
        let view = self
            .state
            .read_registry(|reg| reg.get_view(reg.current_id()))?;
        Ok(view)
    }

    pub fn get_version(&self, id: &str) -> Result<VersionView> {
        let id: VersionId = id.parse()?;
        Ok(self.state.read_registry(|reg| reg.get_view(id))?)
    }

    /// Make `id` current. Only versions whose artifact is on disk qualify.
    #[instrument(skip(self))]
    pub fn switch_version(&self, id: &str) -> Result<VersionView> {
        let id: VersionId = id.parse()?;
        let guard = self.state.try_begin_mutation()?;

        if self.state.read_registry(|reg| reg.contains(id)) && !self.state.store().exists(id) {
            return Err(RegistryError::ArtifactNotFound(id).into());
        }
        self.state
            .mutate_registry(&guard, RegistryChange::Switch(id), |reg| reg.switch_current(id))?;
        self.state.metrics().record_switch();

        Ok(self.state.read_registry(|reg| reg.get_view(id))?)
    }

    /// Record one labelled sample and train the next version on it.
    pub fn retrain(&self, features: FeatureVector, label: Potability) -> Result<RetrainOutcome> {
        features
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        self.workflow.retrain(&LabeledSample::new(features, label))
    }

    /// Drop a non-current, non-baseline version and its artifact.
    #[instrument(skip(self))]
    pub fn delete_version(&self, id: &str) -> Result<VersionRecord> {
        let id: VersionId = id.parse()?;
        let guard = self.state.try_begin_mutation()?;

        let removed = self
            .state
            .mutate_registry(&guard, RegistryChange::Remove(id), |reg| reg.remove(id))?;
        if let Err(e) = self.state.store().remove(id) {
            warn!("{} unregistered but its artifact remains: {}", id, e);
        }
        Ok(removed)
    }

    /// Delete artifacts that no registry entry refers to.
    #[instrument(skip(self))]
    pub fn collect_orphans(&self) -> Result<Vec<VersionId>> {
        let _guard = self.state.try_begin_mutation()?;

        let orphans = self.orphan_artifacts()?;
        for id in &orphans {
            self.state.store().remove(*id)?;
            info!("removed orphan artifact {}", id);
        }
        Ok(orphans)
    }

    fn orphan_artifacts(&self) -> Result<Vec<VersionId>> {
        let registered: BTreeSet<VersionId> = self
            .state
            .read_registry(|reg| reg.list().iter().map(|r| r.version_id).collect());
        Ok(self
            .state
            .store()
            .list()?
            .into_iter()
            .filter(|id| !registered.contains(id))
            .collect())
    }

    /// Cross-check registry and model store without changing either.
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let registry = self.state.registry_snapshot();
        let mut issues = Vec::new();
        let mut missing_artifacts = Vec::new();
        let mut hash_mismatches = Vec::new();

        if let Err(e) = registry.get_current() {
            issues.push(format!("current pointer does not resolve: {e}"));
        }

        for record in registry.list() {
            let id = record.version_id;
            if !self.state.store().exists(id) {
                missing_artifacts.push(id);
                continue;
            }
            match self.state.load_model(record) {
                Ok(_) => {}
                Err(ServiceError::Registry(RegistryError::Corrupted(_))) => hash_mismatches.push(id),
                Err(e) => issues.push(format!("{id}: artifact unreadable: {e}")),
            }
        }

        for pair in registry.list().windows(2) {
            if pair[1].training_sample_count < pair[0].training_sample_count {
                issues.push(format!(
                    "training sample count decreases from {} ({}) to {} ({})",
                    pair[0].version_id,
                    pair[0].training_sample_count,
                    pair[1].version_id,
                    pair[1].training_sample_count
                ));
            }
        }

        let orphan_artifacts = self.orphan_artifacts()?;
        let healthy = issues.is_empty()
            && missing_artifacts.is_empty()
            && hash_mismatches.is_empty()
            && orphan_artifacts.is_empty();
        if !healthy {
            warn!("integrity check found problems in {}", self.state.dir().display());
        }

        Ok(IntegrityReport {
            healthy,
            current_version: registry.current_id(),
            versions_checked: registry.len(),
            missing_artifacts,
            hash_mismatches,
            orphan_artifacts,
            issues,
        })
    }

    pub fn status(&self) -> Result<ServiceStatus> {
        let (current_version, version_count, last_allocated) = self.state.read_registry(|reg| {
            (reg.current_id(), reg.len(), reg.last_allocated())
        });

        Ok(ServiceStatus {
            service_version: crate::VERSION.to_string(),
            current_version,
            version_count,
            last_allocated,
            cached_model: self.state.cached_version(),
            incremental_samples: self.state.incremental().len()?,
            mutation_in_progress: self.state.mutation_in_progress(),
            promotion: self.workflow.policy(),
            metrics: self.state.metrics().snapshot(),
        })
    }
}

impl std::fmt::Debug for PotabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PotabilityService")
            .field("models_dir", &self.config.models_dir)
            .field("state", &self.state)
            .finish()
    }
}
