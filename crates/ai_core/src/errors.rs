//! Error types for the AI Core module

use thiserror::Error;

/// Errors that can occur in the AI Core module
#[derive(Error, Debug)]
pub enum AiCoreError {
    /// A feature value is outside its accepted domain
    #[error("Invalid feature {name}: {reason}")]
    InvalidFeature { name: &'static str, reason: String },

    /// Row length does not match the model
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Label outside {0, 1}
    #[error("Invalid potability label: {0}")]
    InvalidLabel(i64),

    /// Model structure failed validation
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    /// Scaler could not be fitted
    #[error("Scaler fit failed: {0}")]
    ScalerFit(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary encoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Result type for AI Core operations
pub type Result<T> = std::result::Result<T, AiCoreError>;
