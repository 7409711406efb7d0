//! Water potability prediction service
//!
//! Serves predictions from the current model version and grows the model
//! one labelled sample at a time:
//! - versioned (predictor, scaler) artifacts behind a single current pointer
//! - retraining on base plus incremental data, one run at a time
//! - manual switching between versions, including back to the baseline
//! - maintenance: deletion, orphan collection and integrity checks

pub mod config;
pub mod errors;
pub mod handle;
pub mod metrics;
pub mod prediction;
pub mod retrain;
pub mod service;
pub mod state;

pub use config::{LoggingConfig, ServiceConfig};
pub use errors::{Result, ServiceError};
pub use handle::ServiceHandle;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use prediction::{PredictionResponse, PredictionService};
pub use retrain::{PromotionPolicy, RetrainOutcome, RetrainingWorkflow};
pub use service::{IntegrityReport, PotabilityService, ServiceStatus};
pub use state::{CommitHook, LoadedModel, ModelState, RegistryChange};

/// Re-export the data model callers need
pub use potability_ai_core::{FeatureVector, Potability, Prediction};
pub use potability_ai_registry::{VersionId, VersionRecord, VersionView};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
