//! Prediction path
//!
//! Every request resolves the current version at call time. A batch is
//! validated in full before any row is scored and is answered by a single
//! model version.

use potability_ai_core::{FeatureVector, Prediction};
use potability_ai_registry::VersionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{Result, ServiceError};
use crate::state::ModelState;

/// A prediction and the version that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub model_version: VersionId,
}

/// Serves predictions from whichever version is current
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: Arc<ModelState>,
}

impl PredictionService {
    pub fn new(state: Arc<ModelState>) -> Self {
        Self { state }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResponse> {
        if let Err(e) = features.validate() {
            self.state.metrics().record_rejected();
            return Err(ServiceError::InvalidInput(e.to_string()));
        }

        let model = self.state.current_model()?;
        let prediction = model.artifact.predict(features)?;
        self.state.metrics().record_predictions(1, false);
        debug!(
            "predicted {} ({:.3}) with {}",
            prediction.potability, prediction.confidence, model.version
        );

        Ok(PredictionResponse {
            prediction,
            model_version: model.version,
        })
    }

    /// Score every row or none: the first invalid element rejects the batch.
    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<PredictionResponse>> {
        for (index, features) in batch.iter().enumerate() {
            if let Err(e) = features.validate() {
                self.state.metrics().record_rejected();
                return Err(ServiceError::InvalidBatchItem {
                    index,
                    reason: e.to_string(),
                });
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.state.current_model()?;
        let responses = batch
            .iter()
            .map(|features| {
                Ok(PredictionResponse {
                    prediction: model.artifact.predict(features)?,
                    model_version: model.version,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.state.metrics().record_predictions(responses.len(), true);
        debug!("predicted batch of {} with {}", responses.len(), model.version);
        Ok(responses)
    }
}
