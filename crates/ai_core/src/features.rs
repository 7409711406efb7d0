//! Water-quality feature vectors and potability labels
//!
//! Field order matches the column order of the base dataset, which is also
//! the order the scaler and the trees index into.

use crate::errors::{AiCoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of physicochemical measurements per sample
pub const FEATURE_COUNT: usize = 9;

/// Dataset column names, in model order
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "ph",
    "Hardness",
    "Solids",
    "Chloramines",
    "Sulfate",
    "Conductivity",
    "Organic_carbon",
    "Trihalomethanes",
    "Turbidity",
];

/// Dataset column holding the label
pub const LABEL_COLUMN: &str = "Potability";

/// Upper bound of the pH scale
const PH_MAX: f64 = 14.0;

/// One water sample's measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// pH (0-14)
    #[serde(rename = "ph")]
    pub ph: f64,
    /// Hardness in mg/L
    #[serde(rename = "Hardness")]
    pub hardness: f64,
    /// Total dissolved solids in ppm
    #[serde(rename = "Solids")]
    pub solids: f64,
    /// Chloramines in ppm
    #[serde(rename = "Chloramines")]
    pub chloramines: f64,
    /// Sulfate in mg/L
    #[serde(rename = "Sulfate")]
    pub sulfate: f64,
    /// Electrical conductivity in μS/cm
    #[serde(rename = "Conductivity")]
    pub conductivity: f64,
    /// Organic carbon in ppm
    #[serde(rename = "Organic_carbon")]
    pub organic_carbon: f64,
    /// Trihalomethanes in μg/L
    #[serde(rename = "Trihalomethanes")]
    pub trihalomethanes: f64,
    /// Turbidity in NTU
    #[serde(rename = "Turbidity")]
    pub turbidity: f64,
}

impl FeatureVector {
    /// Values in model order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.ph,
            self.hardness,
            self.solids,
            self.chloramines,
            self.sulfate,
            self.conductivity,
            self.organic_carbon,
            self.trihalomethanes,
            self.turbidity,
        ]
    }

    /// Build from a row in model order.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(AiCoreError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        Ok(Self {
            ph: values[0],
            hardness: values[1],
            solids: values[2],
            chloramines: values[3],
            sulfate: values[4],
            conductivity: values[5],
            organic_carbon: values[6],
            trihalomethanes: values[7],
            turbidity: values[8],
        })
    }

    /// Boundary validation for request input.
    ///
    /// Every value must be finite, pH must be within [0, 14] and all other
    /// measurements must be non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in FEATURE_COLUMNS.into_iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(AiCoreError::InvalidFeature {
                    name,
                    reason: format!("value {value} is not finite"),
                });
            }
            if value < 0.0 {
                return Err(AiCoreError::InvalidFeature {
                    name,
                    reason: format!("value {value} is negative"),
                });
            }
        }

        if self.ph > PH_MAX {
            return Err(AiCoreError::InvalidFeature {
                name: FEATURE_COLUMNS[0],
                reason: format!("value {} exceeds {PH_MAX}", self.ph),
            });
        }

        Ok(())
    }
}

/// Binary potability label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Potability {
    NotPotable = 0,
    Potable = 1,
}

impl Potability {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Potability::NotPotable => "Not Potable",
            Potability::Potable => "Potable",
        }
    }

    /// Regression target for tree fitting.
    pub fn as_f64(self) -> f64 {
        match self {
            Potability::NotPotable => 0.0,
            Potability::Potable => 1.0,
        }
    }
}

impl TryFrom<i64> for Potability {
    type Error = AiCoreError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Potability::NotPotable),
            1 => Ok(Potability::Potable),
            other => Err(AiCoreError::InvalidLabel(other)),
        }
    }
}

impl TryFrom<u8> for Potability {
    type Error = AiCoreError;

    fn try_from(value: u8) -> Result<Self> {
        Potability::try_from(i64::from(value))
    }
}

impl From<Potability> for u8 {
    fn from(value: Potability) -> Self {
        value as u8
    }
}

impl fmt::Display for Potability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A feature vector with user-supplied ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: Potability,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, label: Potability) -> Self {
        Self { features, label }
    }
}
