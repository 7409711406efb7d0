//! Shared fixtures: a synthetic base dataset and a small, fast trainer.

#![allow(dead_code)]

use potability_ai_core::FeatureVector;
use potability_ai_service::{PotabilityService, ServiceConfig};
use potability_ai_trainer::{
    BoostingParams, ClassifierTrainer, Dataset, EnsembleTrainer, ForestParams, LcgRng,
    TrainedModel, TrainerConfig, TrainerError,
};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{mpsc, Mutex};
use tempfile::TempDir;

/// Size of the base dataset in the scenarios
pub const BASE_ROWS: usize = 2293;

const HEADER: &str = "ph,Hardness,Solids,Chloramines,Sulfate,Conductivity,Organic_carbon,Trihalomethanes,Turbidity,Potability";

/// Temporary models directory plus its configuration
pub struct Fixture {
    pub dir: TempDir,
    pub config: ServiceConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rows(BASE_ROWS)
    }

    pub fn with_rows(rows: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let base_dataset = dir.path().join("water_potability.csv");
        write_base_dataset(&base_dataset, rows);

        let config = ServiceConfig {
            models_dir: dir.path().join("models"),
            base_dataset,
            trainer: small_trainer_config(),
            ..ServiceConfig::default()
        };
        Self { dir, config }
    }

    pub fn versions_dir(&self) -> std::path::PathBuf {
        self.config.versions_dir()
    }

    /// Train the baseline and return the service.
    pub fn init(&self) -> PotabilityService {
        PotabilityService::initialize_baseline(self.config.clone()).unwrap()
    }
}

/// Few shallow trees; still five-fold cross-validation.
pub fn small_trainer_config() -> TrainerConfig {
    TrainerConfig {
        forest: ForestParams {
            n_estimators: 6,
            max_depth: 4,
            min_samples_split: 8,
            min_samples_leaf: 4,
            ..ForestParams::default()
        },
        boosting: BoostingParams {
            n_estimators: 6,
            learning_rate: 0.3,
            max_depth: 3,
            min_samples_leaf: 4,
            ..BoostingParams::default()
        },
        cv_folds: 5,
        ..TrainerConfig::default()
    }
}

/// Potable iff pH is near neutral and turbidity is low, with 10% label noise.
pub fn write_base_dataset(path: &Path, rows: usize) {
    let mut rng = LcgRng::new(2293);
    let mut out = String::from(HEADER);
    out.push('\n');

    for _ in 0..rows {
        let ph = 14.0 * rng.next_f64();
        let hardness = 100.0 + 200.0 * rng.next_f64();
        let solids = 5_000.0 + 40_000.0 * rng.next_f64();
        let chloramines = 3.0 + 8.0 * rng.next_f64();
        let sulfate = 200.0 + 250.0 * rng.next_f64();
        let conductivity = 200.0 + 500.0 * rng.next_f64();
        let organic_carbon = 5.0 + 20.0 * rng.next_f64();
        let trihalomethanes = 20.0 + 100.0 * rng.next_f64();
        let turbidity = 1.0 + 5.0 * rng.next_f64();

        let mut potable = (5.5..=9.0).contains(&ph) && turbidity < 5.0;
        if rng.next_f64() < 0.1 {
            potable = !potable;
        }

        writeln!(
            out,
            "{ph:.4},{hardness:.4},{solids:.4},{chloramines:.4},{sulfate:.4},{conductivity:.4},{organic_carbon:.4},{trihalomethanes:.4},{turbidity:.4},{}",
            u8::from(potable)
        )
        .unwrap();
    }

    std::fs::write(path, out).unwrap();
}

pub fn potable_sample() -> FeatureVector {
    FeatureVector {
        ph: 7.2,
        hardness: 204.89,
        solids: 20791.32,
        chloramines: 7.3,
        sulfate: 368.52,
        conductivity: 564.31,
        organic_carbon: 10.38,
        trihalomethanes: 86.99,
        turbidity: 2.96,
    }
}

pub fn acidic_sample() -> FeatureVector {
    FeatureVector {
        ph: 2.1,
        turbidity: 5.8,
        ..potable_sample()
    }
}

/// Fails every training run
pub struct FailingTrainer;

impl ClassifierTrainer for FailingTrainer {
    fn train(&self, _dataset: &Dataset) -> Result<TrainedModel, TrainerError> {
        Err(TrainerError::Training("injected failure".to_string()))
    }
}

/// Reports a fixed cross-validated accuracy
pub struct FixedScoreTrainer {
    pub inner: EnsembleTrainer,
    pub cv_accuracy: f64,
}

impl ClassifierTrainer for FixedScoreTrainer {
    fn train(&self, dataset: &Dataset) -> Result<TrainedModel, TrainerError> {
        let mut trained = self.inner.train(dataset)?;
        trained.cv_accuracy = self.cv_accuracy;
        Ok(trained)
    }
}

/// Signals when training starts, then blocks until released
pub struct GatedTrainer {
    inner: EnsembleTrainer,
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedTrainer {
    /// Trainer plus (started receiver, release sender)
    pub fn new(config: TrainerConfig) -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let trainer = Self {
            inner: EnsembleTrainer::new(config),
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        (trainer, started_rx, release_tx)
    }
}

impl ClassifierTrainer for GatedTrainer {
    fn train(&self, dataset: &Dataset) -> Result<TrainedModel, TrainerError> {
        self.started.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        self.inner.train(dataset)
    }
}
