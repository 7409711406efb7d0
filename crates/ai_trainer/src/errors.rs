use potability_ai_core::AiCoreError;
use thiserror::Error;

/// Errors returned by the ensemble trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid trainer config: {0}")]
    InvalidConfig(String),

    #[error("model error: {0}")]
    Model(#[from] AiCoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
