//! Classification metrics and the evaluation report

use potability_ai_core::{ModelArtifact, Potability, Predictor};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::trainer::TrainedModel;

/// Binary confusion matrix with "potable" as the positive class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[Potability], predicted: &[Potability]) -> Self {
        let mut cm = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (Potability::Potable, Potability::Potable) => cm.true_positive += 1,
                (Potability::NotPotable, Potability::NotPotable) => cm.true_negative += 1,
                (Potability::NotPotable, Potability::Potable) => cm.false_positive += 1,
                (Potability::Potable, Potability::NotPotable) => cm.false_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Label counts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub not_potable: usize,
    pub potable: usize,
}

/// Full evaluation of a trained model on a dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub class_distribution: ClassDistribution,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub train_accuracy: f64,
    pub cv_accuracy: f64,
    pub cv_std: f64,
    pub cv_scores: Vec<f64>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Fraction of matching labels (0.0 for empty input)
pub fn accuracy(actual: &[Potability], predicted: &[Potability]) -> f64 {
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    ratio(correct, actual.len())
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Scale and classify raw (unscaled) rows.
pub fn predict_labels(artifact: &ModelArtifact, rows: &[Vec<f64>]) -> Result<Vec<Potability>> {
    rows.iter()
        .map(|row| {
            let scaled = artifact.scaler.transform_row(row)?;
            let p = artifact.predictor.predict_proba(&scaled);
            Ok(if p > 0.5 {
                Potability::Potable
            } else {
                Potability::NotPotable
            })
        })
        .collect()
}

/// Evaluate `model` on `dataset`, carrying over its training-time scores.
pub fn evaluate(model: &TrainedModel, dataset: &Dataset) -> Result<EvaluationReport> {
    if dataset.is_empty() {
        return Err(TrainerError::Dataset(
            "cannot evaluate on an empty dataset".to_string(),
        ));
    }

    let predicted = predict_labels(&model.artifact, &dataset.features)?;
    let cm = ConfusionMatrix::from_predictions(&dataset.labels, &predicted);
    let [not_potable, potable] = dataset.class_counts();

    Ok(EvaluationReport {
        samples: dataset.len(),
        class_distribution: ClassDistribution {
            not_potable,
            potable,
        },
        accuracy: cm.accuracy(),
        precision: cm.precision(),
        recall: cm.recall(),
        f1: cm.f1(),
        confusion_matrix: cm,
        train_accuracy: model.train_accuracy,
        cv_accuracy: model.cv_accuracy,
        cv_std: std_dev(&model.cv_scores),
        cv_scores: model.cv_scores.clone(),
    })
}
