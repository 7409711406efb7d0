//! Artifact blobs and soft voting as seen from outside the crate.

use potability_ai_core::{
    BoostedTrees, EnsembleMember, FeatureVector, ModelArtifact, Node, Potability, Predictor,
    RandomForest, StandardScaler, Tree, VotingEnsemble, FEATURE_COUNT,
};

/// Split on scaled pH at zero: acidic rows go left.
fn ph_stump(left: f64, right: f64) -> Tree {
    Tree::new(vec![
        Node::internal(0, 0, 0.0, 1, 2),
        Node::leaf(1, left),
        Node::leaf(2, right),
    ])
}

fn artifact() -> ModelArtifact {
    let forest = RandomForest::new(vec![ph_stump(0.2, 0.8), ph_stump(0.0, 0.6)]);
    let boosted = BoostedTrees::new(0.0, 1.0, vec![ph_stump(-2.0, 2.0)]);
    ModelArtifact::new(
        VotingEnsemble::new(
            FEATURE_COUNT,
            vec![EnsembleMember::Forest(forest), EnsembleMember::Boosted(boosted)],
        ),
        StandardScaler {
            mean: vec![5.0; FEATURE_COUNT],
            scale: vec![2.0; FEATURE_COUNT],
        },
    )
}

fn sample(ph: f64) -> FeatureVector {
    let mut values = [5.0; FEATURE_COUNT];
    values[0] = ph;
    FeatureVector::from_slice(&values).unwrap()
}

#[test]
fn soft_vote_averages_member_probabilities() {
    let artifact = artifact();
    let scaled = artifact.scaler.transform_row(&sample(8.0).to_array()).unwrap();
    assert!((scaled[0] - 1.5).abs() < 1e-12);

    let forest = (0.8 + 0.6) / 2.0;
    let boosted = 1.0 / (1.0 + (-2.0f64).exp());
    let expected = (forest + boosted) / 2.0;
    assert!((artifact.predictor.predict_proba(&scaled) - expected).abs() < 1e-12);

    let prediction = artifact.predict(&sample(8.0)).unwrap();
    assert_eq!(prediction.potability, Potability::Potable);
    assert!((prediction.confidence - expected).abs() < 1e-12);

    let acidic = artifact.predict(&sample(3.0)).unwrap();
    assert_eq!(acidic.potability, Potability::NotPotable);
    assert_eq!(acidic.potability_label, Potability::NotPotable.label());
}

#[test]
fn blobs_decode_to_an_identical_predictor() {
    let artifact = artifact();
    let bytes = artifact.predictor_bytes().unwrap();
    let scaler = artifact.scaler_json().unwrap();

    let decoded = ModelArtifact::from_parts(&bytes, &scaler).unwrap();
    assert_eq!(decoded, artifact);
    assert_eq!(decoded.hash_hex().unwrap(), artifact.hash_hex().unwrap());
    for ph in [0.5, 6.9, 7.0, 13.5] {
        assert_eq!(
            decoded.predict(&sample(ph)).unwrap(),
            artifact.predict(&sample(ph)).unwrap()
        );
    }
}

#[test]
fn truncated_or_mismatched_blobs_are_rejected() {
    let artifact = artifact();
    let bytes = artifact.predictor_bytes().unwrap();
    let scaler = artifact.scaler_json().unwrap();

    assert!(ModelArtifact::from_parts(&bytes[..bytes.len() / 2], &scaler).is_err());

    let narrow = StandardScaler {
        mean: vec![0.0; 3],
        scale: vec![1.0; 3],
    };
    let narrow_json = serde_json::to_string(&narrow).unwrap();
    assert!(ModelArtifact::from_parts(&bytes, &narrow_json).is_err());
}

#[test]
fn hash_changes_with_any_leaf() {
    let a = artifact();
    let mut b = artifact();
    if let EnsembleMember::Forest(forest) = &mut b.predictor.members[0] {
        forest.trees[0] = ph_stump(0.2, 0.81);
    }
    assert_ne!(a.hash_hex().unwrap(), b.hash_hex().unwrap());
}
