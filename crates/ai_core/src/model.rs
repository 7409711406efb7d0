//! Model artifacts and prediction results
//!
//! A `ModelArtifact` is the (predictor, scaler) pair that a version stores.
//! The predictor is encoded with bincode, the scaler as canonical JSON, and
//! the artifact hash covers both encodings.

use crate::ensemble::VotingEnsemble;
use crate::errors::{AiCoreError, Result};
use crate::features::{FeatureVector, Potability};
use crate::scaler::StandardScaler;
use crate::serde_canon::{hash_parts_hex, to_canonical_json};
use serde::{Deserialize, Serialize};

/// Anything that maps a scaled feature row to P(potable).
pub trait Predictor: Send + Sync {
    /// Expected row width
    fn feature_count(&self) -> usize;

    /// Probability of the positive class
    fn predict_proba(&self, row: &[f64]) -> f64;
}

/// Outcome of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 0 = not potable, 1 = potable
    pub potability: Potability,
    pub potability_label: String,
    /// Probability of the predicted class
    pub confidence: f64,
}

impl Prediction {
    /// Threshold a positive-class probability.
    ///
    /// Ties resolve to "not potable".
    pub fn from_probability(p_potable: f64) -> Self {
        let p = p_potable.clamp(0.0, 1.0);
        let (potability, confidence) = if p > 0.5 {
            (Potability::Potable, p)
        } else {
            (Potability::NotPotable, 1.0 - p)
        };

        Self {
            potability,
            potability_label: potability.label().to_string(),
            confidence,
        }
    }
}

/// Fitted predictor plus the scaler it was trained behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub predictor: VotingEnsemble,
    pub scaler: StandardScaler,
}

impl ModelArtifact {
    pub fn new(predictor: VotingEnsemble, scaler: StandardScaler) -> Self {
        Self { predictor, scaler }
    }

    /// Check predictor structure and that scaler and predictor agree on width.
    pub fn validate(&self) -> Result<()> {
        self.predictor.validate()?;
        if self.scaler.feature_count() != self.predictor.feature_count() {
            return Err(AiCoreError::DimensionMismatch {
                expected: self.predictor.feature_count(),
                actual: self.scaler.feature_count(),
            });
        }
        Ok(())
    }

    /// Scale, then vote.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let scaled = self.scaler.transform_row(&features.to_array())?;
        Ok(Prediction::from_probability(
            self.predictor.predict_proba(&scaled),
        ))
    }

    /// Predictor blob.
    pub fn predictor_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.predictor)?)
    }

    /// Scaler blob.
    pub fn scaler_json(&self) -> Result<String> {
        to_canonical_json(&self.scaler)
    }

    /// Decode from the two blobs written by the model store.
    pub fn from_parts(predictor_bytes: &[u8], scaler_json: &str) -> Result<Self> {
        let predictor: VotingEnsemble = bincode::deserialize(predictor_bytes)?;
        let scaler: StandardScaler = serde_json::from_str(scaler_json)?;
        let artifact = Self::new(predictor, scaler);
        artifact.validate()?;
        Ok(artifact)
    }

    /// BLAKE3 over both blobs, hex encoded.
    pub fn hash_hex(&self) -> Result<String> {
        let predictor = self.predictor_bytes()?;
        let scaler = self.scaler_json()?;
        Ok(hash_parts_hex(&[&predictor, scaler.as_bytes()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{BoostedTrees, EnsembleMember, Node, RandomForest, Tree};
    use crate::features::FEATURE_COUNT;

    fn artifact() -> ModelArtifact {
        let tree = Tree::new(vec![
            Node::internal(0, 0, 0.0, 1, 2),
            Node::leaf(1, 0.1),
            Node::leaf(2, 0.9),
        ]);
        let predictor = VotingEnsemble::new(
            FEATURE_COUNT,
            vec![EnsembleMember::Forest(RandomForest::new(vec![tree]))],
        );
        let scaler = StandardScaler {
            mean: vec![7.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        };
        ModelArtifact::new(predictor, scaler)
    }

    fn features(ph: f64) -> FeatureVector {
        let mut values = [7.0; FEATURE_COUNT];
        values[0] = ph;
        FeatureVector::from_slice(&values).unwrap()
    }

    #[test]
    fn predict_scales_before_voting() {
        let model = artifact();

        let high = model.predict(&features(8.0)).unwrap();
        assert_eq!(high.potability, Potability::Potable);
        assert!((high.confidence - 0.9).abs() < 1e-12);
        assert_eq!(high.potability_label, "Potable");

        let low = model.predict(&features(6.0)).unwrap();
        assert_eq!(low.potability, Potability::NotPotable);
        assert!((low.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn tie_resolves_to_not_potable() {
        let p = Prediction::from_probability(0.5);
        assert_eq!(p.potability, Potability::NotPotable);
        assert_eq!(p.confidence, 0.5);
    }

    #[test]
    fn blobs_decode_to_same_artifact_and_hash() {
        let model = artifact();
        let bytes = model.predictor_bytes().unwrap();
        let json = model.scaler_json().unwrap();

        let restored = ModelArtifact::from_parts(&bytes, &json).unwrap();
        assert_eq!(restored, model);
        assert_eq!(restored.hash_hex().unwrap(), model.hash_hex().unwrap());
        assert_eq!(model.hash_hex().unwrap().len(), 64);
    }

    #[test]
    fn both_member_kinds_survive_the_predictor_blob() {
        let mut model = artifact();
        let tree = model.predictor.members[0].trees()[0].clone();
        model
            .predictor
            .members
            .push(EnsembleMember::Boosted(BoostedTrees::new(-0.4, 0.3, vec![tree])));

        let bytes = model.predictor_bytes().unwrap();
        let restored = ModelArtifact::from_parts(&bytes, &model.scaler_json().unwrap()).unwrap();
        assert_eq!(restored, model);
        assert!(matches!(
            restored.predictor.members.as_slice(),
            [EnsembleMember::Forest(_), EnsembleMember::Boosted(b)] if b.bias == -0.4
        ));
        assert_eq!(
            restored.predict(&features(8.0)).unwrap(),
            model.predict(&features(8.0)).unwrap()
        );
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut model = artifact();
        model.scaler.mean.pop();
        model.scaler.scale.pop();
        assert!(model.validate().is_err());
    }
}
