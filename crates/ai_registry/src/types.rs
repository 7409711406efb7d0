//! Version identifiers and records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RegistryError;

/// Version tag: the baseline, then `V1`, `V2`, ...
///
/// Ordering follows creation order: `Original` sorts before every `V<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionId {
    Original,
    Numbered(u32),
}

impl VersionId {
    const ORIGINAL: &'static str = "Original";

    /// Trailing integer (0 for `Original`)
    pub fn number(self) -> u32 {
        match self {
            VersionId::Original => 0,
            VersionId::Numbered(n) => n,
        }
    }

    pub fn is_original(self) -> bool {
        self == VersionId::Original
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionId::Original => f.write_str(Self::ORIGINAL),
            VersionId::Numbered(n) => write!(f, "V{}", n),
        }
    }
}

impl FromStr for VersionId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::ORIGINAL) {
            return Ok(VersionId::Original);
        }

        let digits = s
            .strip_prefix('V')
            .or_else(|| s.strip_prefix('v'))
            .ok_or_else(|| RegistryError::InvalidVersionId(s.to_string()))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RegistryError::InvalidVersionId(s.to_string()));
        }

        match digits.parse::<u32>() {
            Ok(n) if n > 0 => Ok(VersionId::Numbered(n)),
            _ => Err(RegistryError::InvalidVersionId(s.to_string())),
        }
    }
}

impl TryFrom<String> for VersionId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionId> for String {
    fn from(id: VersionId) -> Self {
        id.to_string()
    }
}

/// One trained artifact's metadata. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: VersionId,
    pub created_at: DateTime<Utc>,
    pub training_sample_count: usize,
    /// Samples added since the previous version (0 for the baseline)
    pub incremental_sample_count: usize,
    pub train_accuracy: f64,
    pub cv_accuracy: f64,
    pub description: String,
    /// BLAKE3 (hex) over the predictor and scaler blobs
    pub artifact_hash: String,
}

/// A record as shown to callers, with the derived `is_current` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionView {
    #[serde(flatten)]
    pub record: VersionRecord,
    pub is_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("Original".parse::<VersionId>().unwrap(), VersionId::Original);
        assert_eq!("V12".parse::<VersionId>().unwrap(), VersionId::Numbered(12));
        assert_eq!("v3".parse::<VersionId>().unwrap(), VersionId::Numbered(3));
        assert_eq!(VersionId::Numbered(7).to_string(), "V7");
        assert_eq!(VersionId::Original.to_string(), "Original");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "V", "V0", "V-1", "V1a", "X1", "V+2", "V99999999999"] {
            assert!(
                matches!(bad.parse::<VersionId>(), Err(RegistryError::InvalidVersionId(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn creation_order() {
        let mut ids = vec![
            VersionId::Numbered(10),
            VersionId::Original,
            VersionId::Numbered(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![VersionId::Original, VersionId::Numbered(2), VersionId::Numbered(10)]
        );
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&VersionId::Numbered(4)).unwrap();
        assert_eq!(json, "\"V4\"");
        let back: VersionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VersionId::Numbered(4));
        assert!(serde_json::from_str::<VersionId>("\"V0\"").is_err());
    }

    #[test]
    fn view_flattens_record() {
        let view = VersionView {
            record: VersionRecord {
                version_id: VersionId::Original,
                created_at: Utc::now(),
                training_sample_count: 10,
                incremental_sample_count: 0,
                train_accuracy: 0.9,
                cv_accuracy: 0.7,
                description: "baseline".to_string(),
                artifact_hash: "ab".to_string(),
            },
            is_current: true,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["version_id"], "Original");
        assert_eq!(value["is_current"], true);
    }
}
