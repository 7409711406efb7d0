//! Service configuration
//!
//! Loaded from TOML when a file is given and present, otherwise built from
//! defaults. Environment variables override the file either way.

use crate::errors::{Result, ServiceError};
use crate::retrain::PromotionPolicy;
use potability_ai_trainer::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `models_dir`
pub const ENV_MODELS_DIR: &str = "POTABILITY_MODELS_DIR";
/// Overrides `base_dataset`
pub const ENV_BASE_DATASET: &str = "POTABILITY_BASE_DATASET";
/// Overrides `logging.level`
pub const ENV_LOG_LEVEL: &str = "POTABILITY_LOG_LEVEL";

/// Name of the directory under `models_dir` holding the registry and artifacts
pub const VERSIONS_DIR: &str = "versions";

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root of the persisted model state
    pub models_dir: PathBuf,
    /// CSV the baseline is trained on; every retrain re-reads it
    pub base_dataset: PathBuf,
    /// Shared by the baseline run and every retrain
    pub trainer: TrainerConfig,
    pub promotion: PromotionPolicy,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            base_dataset: PathBuf::from("data/water_potability.csv"),
            trainer: TrainerConfig::default(),
            promotion: PromotionPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read `path` if given and present, apply environment overrides and
    /// validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                debug!("config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ServiceError::Config(format!("failed to parse config: {e}")))
    }

    /// Apply overrides from `lookup`, normally the process environment.
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = lookup(ENV_MODELS_DIR) {
            self.models_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_BASE_DATASET) {
            self.base_dataset = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.models_dir.as_os_str().is_empty() {
            return Err(ServiceError::Config("models_dir must not be empty".into()));
        }
        if self.base_dataset.as_os_str().is_empty() {
            return Err(ServiceError::Config("base_dataset must not be empty".into()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ServiceError::Config("logging.level must not be empty".into()));
        }
        self.promotion.validate()?;
        self.trainer
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Directory holding `metadata.json`, the artifacts and incremental data
    pub fn versions_dir(&self) -> PathBuf {
        self.models_dir.join(VERSIONS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potability_ai_trainer::Algorithm;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.versions_dir(), PathBuf::from("models/versions"));
        assert_eq!(config.promotion, PromotionPolicy::Always);
    }

    #[test]
    fn parses_partial_toml() {
        let config = ServiceConfig::from_toml_str(
            r#"
            models_dir = "/srv/potability"

            [trainer]
            algorithm = "forest"
            cv_folds = 3

            [trainer.forest]
            n_estimators = 40

            [promotion]
            mode = "no_regression"
            tolerance = 0.02

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.models_dir, PathBuf::from("/srv/potability"));
        assert_eq!(config.base_dataset, ServiceConfig::default().base_dataset);
        assert_eq!(config.trainer.algorithm, Algorithm::Forest);
        assert_eq!(config.trainer.cv_folds, 3);
        assert_eq!(config.trainer.forest.n_estimators, 40);
        assert_eq!(
            config.promotion,
            PromotionPolicy::NoRegression { tolerance: 0.02 }
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = ServiceConfig::default();
        let vars: HashMap<&str, &str> = [
            (ENV_MODELS_DIR, "/tmp/models"),
            (ENV_BASE_DATASET, ""),
            (ENV_LOG_LEVEL, "warn"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.base_dataset, ServiceConfig::default().base_dataset);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = ServiceConfig::default();
        config.trainer.cv_folds = 1;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));

        let mut config = ServiceConfig::default();
        config.models_dir = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.promotion = PromotionPolicy::NoRegression { tolerance: -0.1 };
        assert!(config.validate().is_err());

        assert!(ServiceConfig::from_toml_str("models_dir = 5").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.trainer, TrainerConfig::default());
    }
}
