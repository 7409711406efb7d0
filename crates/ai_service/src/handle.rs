//! Async facade for tokio-based callers
//!
//! Training is CPU-bound and can take tens of seconds, and every mutation
//! writes to disk, so those run on the blocking pool. Mutations that move
//! the current pointer also decode the new model there. Predictions run
//! inline while the cache holds the current model; a cold cache (first
//! call after open, or a failed preload) sends them to the blocking pool.

use potability_ai_core::{FeatureVector, Potability};
use potability_ai_registry::{VersionId, VersionRecord, VersionView};
use std::sync::Arc;
use tokio::task;

use crate::errors::Result;
use crate::prediction::PredictionResponse;
use crate::retrain::RetrainOutcome;
use crate::service::{IntegrityReport, PotabilityService, ServiceStatus};

/// Cheaply cloneable async handle to a `PotabilityService`
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    inner: Arc<PotabilityService>,
}

impl ServiceHandle {
    pub fn new(service: PotabilityService) -> Self {
        Self {
            inner: Arc::new(service),
        }
    }

    pub fn service(&self) -> &PotabilityService {
        &self.inner
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PotabilityService) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&inner)).await?
    }

    pub async fn predict(&self, features: FeatureVector) -> Result<PredictionResponse> {
        if self.inner.state().is_warm() {
            return self.inner.predict(&features);
        }
        self.blocking(move |service| service.predict(&features)).await
    }

    pub async fn predict_batch(&self, batch: Vec<FeatureVector>) -> Result<Vec<PredictionResponse>> {
        if self.inner.state().is_warm() {
            return self.inner.predict_batch(&batch);
        }
        self.blocking(move |service| service.predict_batch(&batch)).await
    }

    pub async fn list_versions(&self) -> Vec<VersionView> {
        self.inner.list_versions()
    }

    pub async fn current_version(&self) -> Result<VersionView> {
        self.inner.current_version()
    }

    pub async fn switch_version(&self, id: String) -> Result<VersionView> {
        self.blocking(move |service| service.switch_version(&id))
            .await
    }

    /// Runs on the blocking pool. Dropping the future does not stop the
    /// training run already in progress.
    pub async fn retrain(&self, features: FeatureVector, label: Potability) -> Result<RetrainOutcome> {
        self.blocking(move |service| service.retrain(features, label))
            .await
    }

    pub async fn delete_version(&self, id: String) -> Result<VersionRecord> {
        self.blocking(move |service| service.delete_version(&id))
            .await
    }

    pub async fn collect_orphans(&self) -> Result<Vec<VersionId>> {
        self.blocking(|service| service.collect_orphans()).await
    }

    pub async fn check_integrity(&self) -> Result<IntegrityReport> {
        self.blocking(|service| service.check_integrity()).await
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        self.blocking(|service| service.status()).await
    }
}
