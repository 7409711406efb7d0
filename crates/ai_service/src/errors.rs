//! Service error types

use potability_ai_core::AiCoreError;
use potability_ai_registry::{RegistryError, VersionId};
use potability_ai_trainer::TrainerError;
use thiserror::Error;

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request failed boundary validation; nothing was changed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One element of a batch is malformed; the whole batch is rejected
    #[error("Invalid batch item {index}: {reason}")]
    InvalidBatchItem { index: usize, reason: String },

    #[error("Retraining already in progress")]
    RetrainInProgress,

    /// The version was registered but the current pointer still names the
    /// previous one. It can be switched to by hand.
    #[error("Version {version} was registered but could not be made current: {source}")]
    PromotionFailed {
        version: VersionId,
        #[source]
        source: RegistryError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Training failed: {0}")]
    Training(#[from] TrainerError),

    #[error("Model error: {0}")]
    Model(#[from] AiCoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// HTTP-equivalent status class for the outer request layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidInput(_) | ServiceError::InvalidBatchItem { .. } => 400,
            ServiceError::RetrainInProgress => 409,
            ServiceError::Registry(e) => match e {
                RegistryError::InvalidVersionId(_) => 400,
                RegistryError::NotFound(_) => 404,
                RegistryError::DuplicateVersion(_)
                | RegistryError::ProtectedVersion { .. }
                | RegistryError::AlreadyInitialized(_) => 409,
                _ => 500,
            },
            ServiceError::Training(TrainerError::Dataset(_)) => 400,
            _ => 500,
        }
    }

    /// Whether the persisted state is still consistent and the caller may
    /// simply retry or correct the request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::InvalidInput(_)
            | ServiceError::InvalidBatchItem { .. }
            | ServiceError::RetrainInProgress
            | ServiceError::PromotionFailed { .. }
            | ServiceError::Training(_) => true,
            ServiceError::Registry(e) => matches!(
                e,
                RegistryError::NotFound(_)
                    | RegistryError::InvalidVersionId(_)
                    | RegistryError::ProtectedVersion { .. }
                    | RegistryError::DuplicateVersion(_)
            ),
            _ => false,
        }
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
