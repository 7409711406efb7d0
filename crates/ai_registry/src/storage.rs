//! Model store: per-version predictor and scaler blobs
//!
//! Layout inside the versions directory:
//! - `model_<version>.bin`: bincode-encoded voting ensemble
//! - `scaler_<version>.json`: canonical JSON standard scaler

use potability_ai_core::serde_canon::hash_parts_hex;
use potability_ai_core::ModelArtifact;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::errors::{RegistryError, Result};
use crate::types::VersionId;

const MODEL_PREFIX: &str = "model_";
const MODEL_SUFFIX: &str = ".bin";
const SCALER_PREFIX: &str = "scaler_";
const SCALER_SUFFIX: &str = ".json";

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write to a temporary file first, then rename for atomicity.
///
/// Readers see either the old file or the new one, never a partial write.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
}

/// Durable persistence of (predictor, scaler) pairs keyed by version id
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, version: VersionId) -> PathBuf {
        self.dir.join(format!("{MODEL_PREFIX}{version}{MODEL_SUFFIX}"))
    }

    pub fn scaler_path(&self, version: VersionId) -> PathBuf {
        self.dir.join(format!("{SCALER_PREFIX}{version}{SCALER_SUFFIX}"))
    }

    /// Write both blobs and return the artifact hash.
    ///
    /// Overwrites leftovers from an earlier crashed attempt with the same id;
    /// such files were never registered.
    #[instrument(skip_all, fields(version = %version))]
    pub fn save(&self, version: VersionId, artifact: &ModelArtifact) -> Result<String> {
        artifact.validate()?;
        let predictor = artifact.predictor_bytes()?;
        let scaler = artifact.scaler_json()?;

        fs::create_dir_all(&self.dir)?;
        write_atomic(&self.model_path(version), &predictor)?;
        write_atomic(&self.scaler_path(version), scaler.as_bytes())?;

        let hash = hash_parts_hex(&[&predictor, scaler.as_bytes()]);
        info!(
            "saved artifact for {} ({} predictor bytes, hash {})",
            version,
            predictor.len(),
            hash
        );
        Ok(hash)
    }

    /// Read and decode both blobs.
    pub fn load(&self, version: VersionId) -> Result<ModelArtifact> {
        self.load_with_hash(version).map(|(artifact, _)| artifact)
    }

    /// Load and check the blobs against the hash recorded at registration.
    #[instrument(skip_all, fields(version = %version))]
    pub fn load_verified(&self, version: VersionId, expected_hash: &str) -> Result<ModelArtifact> {
        let (artifact, actual) = self.load_with_hash(version)?;
        if actual != expected_hash {
            warn!("artifact hash mismatch for {}", version);
            return Err(RegistryError::Corrupted(format!(
                "artifact hash mismatch for {}: expected {}, found {}",
                version, expected_hash, actual
            )));
        }
        Ok(artifact)
    }

    fn load_with_hash(&self, version: VersionId) -> Result<(ModelArtifact, String)> {
        let predictor = read_artifact_file(&self.model_path(version), version)?;
        let scaler = read_artifact_file(&self.scaler_path(version), version)?;
        let scaler = String::from_utf8(scaler).map_err(|_| {
            RegistryError::Corrupted(format!("scaler for {} is not valid UTF-8", version))
        })?;

        let hash = hash_parts_hex(&[&predictor, scaler.as_bytes()]);
        let artifact = ModelArtifact::from_parts(&predictor, &scaler)?;
        debug!("loaded artifact for {}", version);
        Ok((artifact, hash))
    }

    /// Both blobs present
    pub fn exists(&self, version: VersionId) -> bool {
        self.model_path(version).is_file() && self.scaler_path(version).is_file()
    }

    /// Delete both blobs; missing files are ignored.
    #[instrument(skip_all, fields(version = %version))]
    pub fn remove(&self, version: VersionId) -> Result<()> {
        for path in [self.model_path(version), self.scaler_path(version)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Every version id with at least one blob on disk, in creation order.
    pub fn list(&self) -> Result<Vec<VersionId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let stem = name
                .strip_prefix(MODEL_PREFIX)
                .and_then(|s| s.strip_suffix(MODEL_SUFFIX))
                .or_else(|| {
                    name.strip_prefix(SCALER_PREFIX)
                        .and_then(|s| s.strip_suffix(SCALER_SUFFIX))
                });
            if let Some(id) = stem.and_then(|s| s.parse::<VersionId>().ok()) {
                ids.insert(id);
            }
        }

        Ok(ids.into_iter().collect())
    }
}

fn read_artifact_file(path: &Path, version: VersionId) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RegistryError::ArtifactNotFound(version))
        }
        Err(e) => Err(e.into()),
    }
}
