//! Shared model state
//!
//! Readers take a short read lock on the in-memory registry and never touch
//! the metadata file. Writers hold the mutation lock for the whole
//! operation, persist a modified clone of the registry and only then swap it
//! in, so a reader sees either the previous committed state or the next one.
//! When the current pointer moves, the writer also decodes the new model so
//! readers find it already cached.

use parking_lot::{Mutex, MutexGuard, RwLock};
use potability_ai_core::ModelArtifact;
use potability_ai_registry::{
    IncrementalStore, ModelStore, RegistryError, VersionId, VersionRecord, VersionRegistry,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{Result, ServiceError};
use crate::metrics::MetricsCollector;

/// A decoded artifact and the version it belongs to
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub version: VersionId,
    pub artifact: Arc<ModelArtifact>,
}

/// Proof that the caller holds the mutation lock
pub struct MutationGuard<'a> {
    _lock: MutexGuard<'a, ()>,
}

/// Registry change about to be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Add(VersionId),
    Switch(VersionId),
    Remove(VersionId),
}

impl fmt::Display for RegistryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryChange::Add(id) => write!(f, "add {id}"),
            RegistryChange::Switch(id) => write!(f, "switch to {id}"),
            RegistryChange::Remove(id) => write!(f, "remove {id}"),
        }
    }
}

/// Consulted before every registry commit; an error aborts that commit
/// and is returned to the caller unchanged.
pub type CommitHook =
    Arc<dyn Fn(RegistryChange) -> std::result::Result<(), RegistryError> + Send + Sync>;

/// Registry, stores, prediction cache and counters behind one handle
pub struct ModelState {
    dir: PathBuf,
    registry: RwLock<VersionRegistry>,
    store: ModelStore,
    incremental: IncrementalStore,
    mutation: Mutex<()>,
    cache: RwLock<Option<LoadedModel>>,
    commit_hook: RwLock<Option<CommitHook>>,
    metrics: MetricsCollector,
}

impl ModelState {
    /// Open the initialized versions directory `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let registry = VersionRegistry::load(dir)?;
        Ok(Self::with_registry(dir, registry))
    }

    pub(crate) fn with_registry(dir: &Path, registry: VersionRegistry) -> Self {
        Self {
            dir: dir.to_path_buf(),
            registry: RwLock::new(registry),
            store: ModelStore::new(dir),
            incremental: IncrementalStore::new(dir),
            mutation: Mutex::new(()),
            cache: RwLock::new(None),
            commit_hook: RwLock::new(None),
            metrics: MetricsCollector::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn incremental(&self) -> &IncrementalStore {
        &self.incremental
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run `f` against the last committed registry.
    pub fn read_registry<R>(&self, f: impl FnOnce(&VersionRegistry) -> R) -> R {
        f(&self.registry.read())
    }

    /// Copy of the last committed registry
    pub fn registry_snapshot(&self) -> VersionRegistry {
        self.registry.read().clone()
    }

    /// Take the mutation lock without waiting.
    pub fn try_begin_mutation(&self) -> Result<MutationGuard<'_>> {
        match self.mutation.try_lock() {
            Some(lock) => Ok(MutationGuard { _lock: lock }),
            None => {
                self.metrics.record_busy();
                Err(ServiceError::RetrainInProgress)
            }
        }
    }

    /// Whether a mutation currently holds the lock
    pub fn mutation_in_progress(&self) -> bool {
        self.mutation.is_locked()
    }

    /// Install or clear the hook run before each registry commit.
    pub fn set_commit_hook(&self, hook: Option<CommitHook>) {
        *self.commit_hook.write() = hook;
    }

    /// Apply a persisting registry operation and publish the result.
    ///
    /// `change` names what `f` does and is offered to the commit hook first.
    /// On failure the committed registry is left untouched. When the
    /// current pointer moves, the new model is loaded into the cache before
    /// the registry is swapped in.
    pub fn mutate_registry<T, F>(
        &self,
        _guard: &MutationGuard<'_>,
        change: RegistryChange,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut VersionRegistry) -> std::result::Result<T, RegistryError>,
    {
        let hook = self.commit_hook.read().clone();
        if let Some(hook) = hook {
            if let Err(e) = hook(change) {
                warn!("registry commit ({}) refused: {}", change, e);
                return Err(e.into());
            }
        }

        let mut next = self.registry_snapshot();
        let value = f(&mut next)?;

        let moved = self.read_registry(|reg| reg.current_id()) != next.current_id();
        let warmed = if moved { self.warm(&next) } else { None };

        let mut committed = self.registry.write();
        *committed = next;
        if moved {
            debug!("current pointer moved to {}", committed.current_id());
            *self.cache.write() = warmed;
        }
        Ok(value)
    }

    /// Decode the current model of a registry that is about to be published.
    ///
    /// A load failure is not a commit failure: the cache stays cold and the
    /// next prediction reports the error.
    fn warm(&self, registry: &VersionRegistry) -> Option<LoadedModel> {
        let record = registry.get_current().ok()?;
        match self.load_model(record) {
            Ok(loaded) => {
                info!("loaded model {} into prediction cache", loaded.version);
                Some(loaded)
            }
            Err(e) => {
                warn!("could not preload model {}: {}", record.version_id, e);
                None
            }
        }
    }

    /// Predictor for the current version, loaded through the cache.
    pub fn current_model(&self) -> Result<LoadedModel> {
        let record = self.read_registry(|reg| reg.get_current().cloned())?;

        if let Some(cached) = self.cache.read().as_ref() {
            if cached.version == record.version_id {
                self.metrics.record_cache(true);
                return Ok(cached.clone());
            }
        }

        self.metrics.record_cache(false);
        let loaded = self.load_model(&record)?;
        *self.cache.write() = Some(loaded.clone());
        info!("loaded model {} into prediction cache", loaded.version);
        Ok(loaded)
    }

    /// Decode and hash-check the artifact behind `record`.
    pub fn load_model(&self, record: &VersionRecord) -> Result<LoadedModel> {
        let artifact = if record.artifact_hash.is_empty() {
            self.store.load(record.version_id)?
        } else {
            self.store
                .load_verified(record.version_id, &record.artifact_hash)?
        };
        Ok(LoadedModel {
            version: record.version_id,
            artifact: Arc::new(artifact),
        })
    }

    /// Version held by the prediction cache, if any
    pub fn cached_version(&self) -> Option<VersionId> {
        self.cache.read().as_ref().map(|m| m.version)
    }

    /// Whether a prediction can be served without touching disk
    pub fn is_warm(&self) -> bool {
        self.cached_version() == Some(self.read_registry(|reg| reg.current_id()))
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("dir", &self.dir)
            .field("current", &self.registry.read().current_id())
            .field("cached", &self.cached_version())
            .finish()
    }
}
