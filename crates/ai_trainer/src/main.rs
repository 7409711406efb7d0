//! Potability ensemble trainer CLI
//!
//! Offline trainer: fits the voting ensemble on a CSV dataset and writes
//! the artifact blobs, their hash and an evaluation report.

use anyhow::{Context, Result};
use clap::Parser;
use potability_ai_core::serde_canon::to_canonical_json;
use potability_ai_trainer::{evaluate, Algorithm, ClassifierTrainer, Dataset, EnsembleTrainer, TrainerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "potability-train")]
#[command(author = "Potability Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic ensemble trainer for water potability", long_about = None)]
struct Args {
    /// Input CSV dataset path (nine feature columns plus Potability)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the artifact and metrics
    #[arg(short, long, default_value = "models/trained")]
    output: PathBuf,

    /// Trainer configuration (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ensemble members: ensemble, forest or boosting
    #[arg(long)]
    algorithm: Option<String>,

    /// Trees per member
    #[arg(long)]
    trees: Option<usize>,

    /// Cross-validation folds
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Random seed for deterministic sampling
    #[arg(long)]
    seed: Option<i64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<TrainerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&raw).context("Failed to parse trainer config")?
        }
        None => TrainerConfig::default(),
    };

    if let Some(algorithm) = &args.algorithm {
        config.algorithm = match algorithm.as_str() {
            "ensemble" => Algorithm::Ensemble,
            "forest" => Algorithm::Forest,
            "boosting" => Algorithm::Boosting,
            other => anyhow::bail!("unknown algorithm '{}'", other),
        };
    }
    if let Some(trees) = args.trees {
        config.forest.n_estimators = trees;
        config.boosting.n_estimators = trees;
    }
    if let Some(folds) = args.cv_folds {
        config.cv_folds = folds;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Potability ensemble trainer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    info!("Loading dataset from: {}", args.input.display());
    let dataset = Dataset::from_csv(&args.input).context("Failed to load dataset")?;
    info!(
        "Loaded {} samples with {} features",
        dataset.len(),
        dataset.feature_count()
    );

    for stat in dataset.feature_stats() {
        info!("  {}: min={}, max={}", stat.name, stat.min, stat.max);
    }

    info!("Training configuration:");
    info!("  Algorithm: {:?}", config.algorithm);
    info!(
        "  Forest: {} trees, depth {}",
        config.forest.n_estimators, config.forest.max_depth
    );
    info!(
        "  Boosting: {} trees, depth {}, learning rate {}",
        config.boosting.n_estimators, config.boosting.max_depth, config.boosting.learning_rate
    );
    info!("  CV folds: {}, seed: {}", config.cv_folds, config.seed);

    let trainer = EnsembleTrainer::new(config);
    let model = trainer.train(&dataset)?;
    let report = evaluate(&model, &dataset)?;

    std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let model_path = args.output.join("model.bin");
    let scaler_path = args.output.join("scaler.json");
    let hash_path = args.output.join("model.hash");
    let metrics_path = args.output.join("metrics.json");

    std::fs::write(&model_path, model.artifact.predictor_bytes()?)
        .context("Failed to write model file")?;
    std::fs::write(&scaler_path, model.artifact.scaler_json()?)
        .context("Failed to write scaler file")?;

    let hash_hex = model.artifact.hash_hex()?;
    std::fs::write(&hash_path, &hash_hex).context("Failed to write hash file")?;

    std::fs::write(&metrics_path, to_canonical_json(&report)?)
        .context("Failed to write metrics file")?;

    info!("Training completed");
    info!("  Train accuracy: {:.4}", report.train_accuracy);
    info!(
        "  CV accuracy: {:.4} (+/- {:.4})",
        report.cv_accuracy, report.cv_std
    );
    info!("  Model: {}", model_path.display());
    info!("  Scaler: {}", scaler_path.display());
    info!("  Metrics: {}", metrics_path.display());
    info!("  Hash: {}", hash_hex);

    Ok(())
}
