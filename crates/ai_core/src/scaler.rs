//! Standard scaler: per-feature zero mean and unit variance.

use crate::errors::{AiCoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted per-feature mean and scale.
///
/// Uses the population standard deviation. Constant columns get a scale of
/// 1.0 so they pass through centred but unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a non-empty, rectangular set of rows.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| AiCoreError::ScalerFit("no rows".to_string()))?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(AiCoreError::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (acc, value) in mean.iter_mut().zip(row) {
                *acc += value;
            }
        }
        for acc in &mut mean {
            *acc /= n;
        }

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((acc, value), mu) in variance.iter_mut().zip(row).zip(&mean) {
                let diff = value - mu;
                *acc += diff * diff;
            }
        }

        let scale = variance
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON && std.is_finite() {
                    std
                } else {
                    debug!("feature column {} is constant, leaving it unscaled", i);
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    /// Scale one row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.mean.len() {
            return Err(AiCoreError::DimensionMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, mu), sigma)| (x - mu) / sigma)
            .collect())
    }

    /// Scale every row.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
