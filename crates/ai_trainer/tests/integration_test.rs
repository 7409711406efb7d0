//! Integration tests for the deterministic ensemble trainer
//!
//! Ensures identical models are produced across runs and that a trained
//! artifact survives its own blob encoding.

use anyhow::Result;
use potability_ai_core::{FeatureVector, ModelArtifact, Potability};
use potability_ai_trainer::{
    evaluate, train_model_from_csv, BoostingParams, ClassifierTrainer, Dataset, EnsembleTrainer,
    ForestParams, MaxFeatures, TrainerConfig,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn small_config() -> TrainerConfig {
    TrainerConfig {
        forest: ForestParams {
            n_estimators: 8,
            max_depth: 4,
            min_samples_split: 4,
            min_samples_leaf: 2,
            ..ForestParams::default()
        },
        boosting: BoostingParams {
            n_estimators: 8,
            learning_rate: 0.2,
            max_depth: 3,
            min_samples_leaf: 2,
            ..BoostingParams::default()
        },
        cv_folds: 4,
        ..TrainerConfig::default()
    }
}

/// Synthetic water-quality table; potable iff 6.5 <= ph <= 8.5 and turbidity < 5
fn create_synthetic_dataset(rows: usize) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        "ph,Hardness,Solids,Chloramines,Sulfate,Conductivity,Organic_carbon,Trihalomethanes,Turbidity,Potability"
    )?;

    for i in 0..rows {
        let ph = 3.0 + (i % 40) as f64 * 0.2;
        let turbidity = 2.0 + (i % 9) as f64 * 0.5;
        let potable = (6.5..=8.5).contains(&ph) && turbidity < 5.0;
        writeln!(
            file,
            "{:.2},{},{},{},{},{},{},{},{:.2},{}",
            ph,
            180 + i % 23,
            18_000 + (i % 31) * 250,
            6 + i % 4,
            300 + i % 19,
            380 + i % 41,
            12 + i % 6,
            60 + i % 15,
            turbidity,
            u8::from(potable)
        )?;
    }

    file.flush()?;
    Ok(file)
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let file = create_synthetic_dataset(120)?;

    let model1 = train_model_from_csv(file.path(), small_config())?;
    let model2 = train_model_from_csv(file.path(), small_config())?;

    assert_eq!(model1.artifact, model2.artifact, "Artifacts should be identical");
    assert_eq!(model1.cv_scores, model2.cv_scores, "CV scores should be identical");
    assert_eq!(model1.artifact.hash_hex()?, model2.artifact.hash_hex()?);

    Ok(())
}

#[test]
fn test_seed_changes_model() -> Result<()> {
    let file = create_synthetic_dataset(120)?;
    let dataset = Dataset::from_csv(file.path())?;

    let a = EnsembleTrainer::new(small_config()).fit(&dataset)?;
    let b = EnsembleTrainer::new(TrainerConfig {
        seed: 7,
        ..small_config()
    })
    .fit(&dataset)?;

    assert_ne!(a.hash_hex()?, b.hash_hex()?);
    Ok(())
}

#[test]
fn test_artifact_blob_roundtrip_predicts_identically() -> Result<()> {
    let file = create_synthetic_dataset(80)?;
    let dataset = Dataset::from_csv(file.path())?;
    let model = EnsembleTrainer::new(small_config()).train(&dataset)?;

    let restored = ModelArtifact::from_parts(
        &model.artifact.predictor_bytes()?,
        &model.artifact.scaler_json()?,
    )?;
    assert_eq!(restored.hash_hex()?, model.artifact.hash_hex()?);

    for row in dataset.features.iter().take(10) {
        let fv = FeatureVector::from_slice(row)?;
        assert_eq!(restored.predict(&fv)?, model.artifact.predict(&fv)?);
    }

    Ok(())
}

#[test]
fn test_evaluation_report() -> Result<()> {
    let file = create_synthetic_dataset(120)?;
    let dataset = Dataset::from_csv(file.path())?;
    let model = EnsembleTrainer::new(small_config()).train(&dataset)?;

    let report = evaluate(&model, &dataset)?;
    let [not_potable, potable] = dataset.class_counts();

    assert_eq!(report.samples, 120);
    assert_eq!(report.class_distribution.potable, potable);
    assert_eq!(report.class_distribution.not_potable, not_potable);
    assert_eq!(report.confusion_matrix.total(), 120);
    assert!((report.accuracy - model.train_accuracy).abs() < 1e-12);
    assert_eq!(report.cv_scores.len(), 4);

    let json = serde_json::to_value(&report)?;
    assert!(json.get("confusion_matrix").is_some());

    Ok(())
}

#[test]
fn test_prediction_uses_both_members() -> Result<()> {
    let file = create_synthetic_dataset(200)?;
    let mut config = small_config();
    config.forest.n_estimators = 20;
    config.forest.max_features = MaxFeatures::All;
    config.boosting.n_estimators = 20;
    let model = train_model_from_csv(file.path(), config)?;
    assert_eq!(model.artifact.predictor.members.len(), 2);

    let clean = FeatureVector {
        ph: 7.4,
        hardness: 190.0,
        solids: 19_000.0,
        chloramines: 7.0,
        sulfate: 305.0,
        conductivity: 400.0,
        organic_carbon: 14.0,
        trihalomethanes: 66.0,
        turbidity: 2.5,
    };
    let acidic = FeatureVector { ph: 3.2, ..clean };

    let good = model.artifact.predict(&clean)?;
    let bad = model.artifact.predict(&acidic)?;

    assert_eq!(good.potability, Potability::Potable);
    assert_eq!(bad.potability, Potability::NotPotable);
    assert!((0.5..=1.0).contains(&good.confidence));
    assert_eq!(good.potability_label, "Potable");

    Ok(())
}
