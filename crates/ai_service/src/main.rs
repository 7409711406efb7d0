//! Potability service CLI
//!
//! Each subcommand opens the models directory, performs one operation and
//! prints the result as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use potability_ai_core::{FeatureVector, Potability};
use potability_ai_service::{PotabilityService, ServiceConfig, ServiceHandle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "potability")]
#[command(author = "Potability Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned water potability models: predict, retrain, switch", long_about = None)]
struct Cli {
    /// Service configuration (TOML); defaults are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the baseline "Original" version and create the registry
    Init,
    /// Predict one sample (inline JSON object or path to a JSON file)
    Predict {
        #[arg(short, long)]
        input: String,
    },
    /// Predict a JSON array of samples; any invalid element rejects the batch
    PredictBatch {
        #[arg(short, long)]
        input: String,
    },
    /// List all versions in creation order
    Versions,
    /// Show the current version
    Current,
    /// Make a version current
    Switch { version: String },
    /// Add one labelled sample and train the next version
    Retrain {
        #[arg(short, long)]
        input: String,
        /// 1 = potable, 0 = not potable
        #[arg(short, long)]
        label: u8,
    },
    /// Delete a version that is neither the baseline nor current
    Delete { version: String },
    /// Remove artifacts with no registry entry
    Gc,
    /// Cross-check registry and artifacts
    Check,
    /// Show service status and counters
    Status,
}

fn init_logging(level: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// Inline JSON, or the contents of the file it names.
fn read_json_arg(input: &str) -> Result<String> {
    let path = Path::new(input);
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    } else {
        Ok(input.to_string())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, config: ServiceConfig) -> Result<()> {
    if matches!(cli.command, Command::Init) {
        let service = tokio::task::spawn_blocking(move || {
            PotabilityService::initialize_baseline(config)
        })
        .await??;
        return print_json(&service.current_version()?);
    }

    let handle = ServiceHandle::new(
        PotabilityService::open(config).context("Failed to open models directory")?,
    );

    match cli.command {
        // Runs before the registry exists, see above
        Command::Init => Ok(()),
        Command::Predict { input } => {
            let features: FeatureVector = serde_json::from_str(&read_json_arg(&input)?)
                .context("Invalid feature vector")?;
            print_json(&handle.predict(features).await?)
        }
        Command::PredictBatch { input } => {
            let batch: Vec<FeatureVector> = serde_json::from_str(&read_json_arg(&input)?)
                .context("Invalid feature vector batch")?;
            print_json(&handle.predict_batch(batch).await?)
        }
        Command::Versions => print_json(&handle.list_versions().await),
        Command::Current => print_json(&handle.current_version().await?),
        Command::Switch { version } => print_json(&handle.switch_version(version).await?),
        Command::Retrain { input, label } => {
            let features: FeatureVector = serde_json::from_str(&read_json_arg(&input)?)
                .context("Invalid feature vector")?;
            let label = Potability::try_from(label)?;
            let outcome = handle.retrain(features, label).await?;
            info!(
                "created {} (current: {})",
                outcome.version.record.version_id, outcome.promoted
            );
            print_json(&outcome)
        }
        Command::Delete { version } => print_json(&handle.delete_version(version).await?),
        Command::Gc => print_json(&handle.collect_orphans().await?),
        Command::Check => {
            let report = handle.check_integrity().await?;
            print_json(&report)?;
            if !report.healthy {
                anyhow::bail!("integrity check failed");
            }
            Ok(())
        }
        Command::Status => print_json(&handle.status().await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging.level, cli.verbose)?;

    info!("Potability service v{}", env!("CARGO_PKG_VERSION"));

    run(cli, config).await.map_err(|e| {
        error!("{:#}", e);
        e
    })
}
