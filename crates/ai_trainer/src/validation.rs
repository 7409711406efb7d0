//! Stratified k-fold cross-validation

use potability_ai_core::{ModelArtifact, Potability};
use tracing::debug;

use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::metrics::{accuracy, predict_labels};

/// Test-row indices for each of `k` folds.
///
/// No shuffling: rows of each class are dealt round-robin in file order,
/// continuing the rotation from one class to the next so every fold gets a
/// near-equal share of both classes and of the total.
pub fn stratified_folds(labels: &[Potability], k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(TrainerError::InvalidConfig(format!(
            "cross-validation needs at least 2 folds, got {}",
            k
        )));
    }
    if labels.len() < k {
        return Err(TrainerError::Dataset(format!(
            "{} samples cannot be split into {} folds",
            labels.len(),
            k
        )));
    }

    let mut folds = vec![Vec::new(); k];
    let mut next = 0usize;
    for class in [Potability::NotPotable, Potability::Potable] {
        for (idx, _) in labels.iter().enumerate().filter(|&(_, &l)| l == class) {
            folds[next % k].push(idx);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }

    Ok(folds)
}

/// Accuracy of `fit` on each held-out fold.
///
/// `fit` sees only the training folds, so any preprocessing it fits (the
/// scaler included) never observes the held-out rows.
pub fn cross_validate<F>(dataset: &Dataset, k: usize, fit: F) -> Result<Vec<f64>>
where
    F: Fn(&Dataset, usize) -> Result<ModelArtifact>,
{
    let folds = stratified_folds(&dataset.labels, k)?;
    let mut scores = Vec::with_capacity(k);

    for (fold_idx, test_idx) in folds.iter().enumerate() {
        let mut in_test = vec![false; dataset.len()];
        for &i in test_idx {
            in_test[i] = true;
        }
        let train_idx: Vec<usize> = (0..dataset.len()).filter(|&i| !in_test[i]).collect();

        let train = dataset.subset(&train_idx);
        let test = dataset.subset(test_idx);

        let artifact = fit(&train, fold_idx)?;
        let predicted = predict_labels(&artifact, &test.features)?;
        let score = accuracy(&test.labels, &predicted);

        debug!(
            "fold {}/{}: train={} test={} accuracy={:.4}",
            fold_idx + 1,
            k,
            train.len(),
            test.len(),
            score
        );
        scores.push(score);
    }

    Ok(scores)
}
