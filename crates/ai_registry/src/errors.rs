//! Error types for the model registry

use crate::types::VersionId;
use potability_ai_core::AiCoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the registry, model store or sample store
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No record with this id
    #[error("Version not found: {0}")]
    NotFound(VersionId),

    /// Record id already registered
    #[error("Version already exists: {0}")]
    DuplicateVersion(VersionId),

    /// Registered version without artifact files
    #[error("Artifact not found for version {0}")]
    ArtifactNotFound(VersionId),

    /// Refused to delete the baseline or the current version
    #[error("Version {version} is protected: {reason}")]
    ProtectedVersion {
        version: VersionId,
        reason: &'static str,
    },

    /// Malformed or out-of-sequence version id
    #[error("Invalid version id: {0}")]
    InvalidVersionId(String),

    /// Persisted state violates an invariant
    #[error("Corrupted registry state: {0}")]
    Corrupted(String),

    /// No registry file in the models directory
    #[error("Registry not initialized at {}", .0.display())]
    NotInitialized(PathBuf),

    /// A registry file already exists
    #[error("Registry already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Artifact encoding or decoding error
    #[error("Artifact encoding error: {0}")]
    Encoding(#[from] AiCoreError),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
