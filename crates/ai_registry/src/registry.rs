//! Version registry
//!
//! Single source of truth for which versions exist and which one is
//! current. Backed by one JSON file that is read fully on open and
//! rewritten fully (temp file + rename) on every mutation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::errors::{RegistryError, Result};
use crate::storage::write_atomic;
use crate::types::{VersionId, VersionRecord, VersionView};

/// Registry file name inside the versions directory
pub const METADATA_FILE: &str = "metadata.json";

/// On-disk form of the registry
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    current_version: VersionId,
    /// Highest `V<n>` ever allocated, so deleted numbers are never reused
    last_allocated: u32,
    versions: Vec<VersionRecord>,
}

/// In-memory registry bound to its metadata file
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRegistry {
    path: PathBuf,
    current: VersionId,
    last_allocated: u32,
    versions: Vec<VersionRecord>,
}

impl VersionRegistry {
    /// Metadata file path for a versions directory
    pub fn metadata_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE)
    }

    /// Whether a registry has been initialized in `dir`
    pub fn exists(dir: &Path) -> bool {
        Self::metadata_path(dir).is_file()
    }

    /// Read and validate the registry in `dir`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::metadata_path(dir);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotInitialized(path));
            }
            Err(e) => return Err(e.into()),
        };

        let file: RegistryFile = serde_json::from_slice(&raw)?;
        let registry = Self {
            path,
            current: file.current_version,
            last_allocated: file.last_allocated,
            versions: file.versions,
        };
        registry.check_invariants()?;

        info!(
            "loaded registry: {} versions, current {}",
            registry.versions.len(),
            registry.current
        );
        Ok(registry)
    }

    /// Create a fresh registry holding only the baseline record.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn initialize(dir: &Path, original: VersionRecord) -> Result<Self> {
        let path = Self::metadata_path(dir);
        if path.exists() {
            return Err(RegistryError::AlreadyInitialized(path));
        }
        if !original.version_id.is_original() {
            return Err(RegistryError::InvalidVersionId(format!(
                "baseline must be Original, got {}",
                original.version_id
            )));
        }

        std::fs::create_dir_all(dir)?;
        let registry = Self {
            path,
            current: VersionId::Original,
            last_allocated: 0,
            versions: vec![original],
        };
        registry.persist()?;

        info!("initialized registry with baseline version");
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in creation order
    pub fn list(&self) -> &[VersionRecord] {
        &self.versions
    }

    /// All records in creation order, flagged with `is_current`
    pub fn list_views(&self) -> Vec<VersionView> {
        self.versions.iter().map(|r| self.view(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, id: VersionId) -> bool {
        self.versions.iter().any(|r| r.version_id == id)
    }

    pub fn get(&self, id: VersionId) -> Result<&VersionRecord> {
        self.versions
            .iter()
            .find(|r| r.version_id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn get_view(&self, id: VersionId) -> Result<VersionView> {
        self.get(id).map(|r| self.view(r))
    }

    pub fn current_id(&self) -> VersionId {
        self.current
    }

    /// Record the current pointer references.
    ///
    /// `NotFound` here means the persisted state is corrupted.
    pub fn get_current(&self) -> Result<&VersionRecord> {
        self.get(self.current)
    }

    /// Most recently created record
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.last()
    }

    pub fn last_allocated(&self) -> u32 {
        self.last_allocated
    }

    /// Id the next `add_version` must use
    pub fn next_version_id(&self) -> VersionId {
        VersionId::Numbered(self.last_allocated.saturating_add(1))
    }

    /// Append a new record and persist.
    #[instrument(skip_all, fields(version = %record.version_id))]
    pub fn add_version(&mut self, record: VersionRecord) -> Result<()> {
        let id = record.version_id;
        if self.contains(id) {
            return Err(RegistryError::DuplicateVersion(id));
        }
        let VersionId::Numbered(n) = id else {
            return Err(RegistryError::DuplicateVersion(id));
        };
        if n <= self.last_allocated {
            return Err(RegistryError::InvalidVersionId(format!(
                "{} was already allocated (last allocated V{})",
                id, self.last_allocated
            )));
        }

        self.commit(|reg| {
            reg.last_allocated = n;
            reg.versions.push(record);
        })?;

        info!("registered version {}", id);
        Ok(())
    }

    /// Point `current` at an existing version and persist.
    #[instrument(skip_all, fields(version = %id))]
    pub fn switch_current(&mut self, id: VersionId) -> Result<()> {
        if !self.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        if self.current == id {
            return Ok(());
        }

        let previous = self.current;
        self.commit(|reg| reg.current = id)?;

        info!("switched current version {} -> {}", previous, id);
        Ok(())
    }

    /// Drop a record and persist. The baseline and the current version are
    /// protected.
    #[instrument(skip_all, fields(version = %id))]
    pub fn remove(&mut self, id: VersionId) -> Result<VersionRecord> {
        if id.is_original() {
            return Err(RegistryError::ProtectedVersion {
                version: id,
                reason: "the baseline version cannot be deleted",
            });
        }
        if id == self.current {
            return Err(RegistryError::ProtectedVersion {
                version: id,
                reason: "the current version cannot be deleted",
            });
        }
        let idx = self
            .versions
            .iter()
            .position(|r| r.version_id == id)
            .ok_or(RegistryError::NotFound(id))?;

        let mut removed = None;
        self.commit(|reg| removed = Some(reg.versions.remove(idx)))?;

        info!("removed version {}", id);
        removed.ok_or(RegistryError::NotFound(id))
    }

    fn view(&self, record: &VersionRecord) -> VersionView {
        VersionView {
            record: record.clone(),
            is_current: record.version_id == self.current,
        }
    }

    /// Apply `mutate`, persist, and roll back in memory if persisting fails.
    fn commit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        let snapshot = self.clone();
        mutate(self);
        if let Err(e) = self.persist() {
            *self = snapshot;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let file = RegistryFile {
            current_version: self.current,
            last_allocated: self.last_allocated,
            versions: self.versions.clone(),
        };
        let data = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &data)?;
        Ok(())
    }

    /// Structural invariants of a loaded registry.
    fn check_invariants(&self) -> Result<()> {
        let corrupted = |msg: String| Err(RegistryError::Corrupted(msg));

        match self.versions.first() {
            Some(first) if first.version_id.is_original() => {}
            Some(first) => {
                return corrupted(format!("first version is {}, expected Original", first.version_id))
            }
            None => return corrupted("registry has no versions".to_string()),
        }

        let mut seen = HashSet::new();
        for pair in self.versions.windows(2) {
            if pair[1].version_id <= pair[0].version_id {
                return corrupted(format!(
                    "versions out of order: {} after {}",
                    pair[1].version_id, pair[0].version_id
                ));
            }
        }
        for record in &self.versions {
            if !seen.insert(record.version_id) {
                return corrupted(format!("duplicate version {}", record.version_id));
            }
            if record.version_id.number() > self.last_allocated {
                return corrupted(format!(
                    "{} exceeds last allocated number {}",
                    record.version_id, self.last_allocated
                ));
            }
        }

        if !self.contains(self.current) {
            return corrupted(format!("current version {} has no record", self.current));
        }

        Ok(())
    }
}
