//! Append-only store of user-labelled samples
//!
//! Plain CSV with the base dataset's header, so the file can be fed to the
//! trainer or inspected by hand. Rows are never rewritten or removed.

use potability_ai_core::{
    FeatureVector, LabeledSample, Potability, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN,
};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::errors::{RegistryError, Result};

/// Incremental data file name inside the versions directory
pub const INCREMENTAL_FILE: &str = "incremental_training_data.csv";

#[derive(Debug, Clone)]
pub struct IncrementalStore {
    path: PathBuf,
}

impl IncrementalStore {
    /// Store for the versions directory `dir`
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(INCREMENTAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header() -> String {
        let mut header = FEATURE_COLUMNS.join(",");
        header.push(',');
        header.push_str(LABEL_COLUMN);
        header
    }

    /// Durably append one sample.
    #[instrument(skip_all, fields(label = %sample.label))]
    pub fn append(&self, sample: &LabeledSample) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.drop_torn_tail(&file)?;

        let mut line = String::new();
        if file.metadata()?.len() == 0 {
            line.push_str(&Self::header());
            line.push('\n');
        }
        let values: Vec<String> = sample
            .features
            .to_array()
            .iter()
            .map(f64::to_string)
            .collect();
        line.push_str(&values.join(","));
        line.push(',');
        line.push_str(&u8::from(sample.label).to_string());
        line.push('\n');

        // One write call per row keeps concurrent appenders from interleaving.
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        debug!("appended incremental sample to {}", self.path.display());
        Ok(())
    }

    /// Cut an incomplete last row left by a crash so the next row starts
    /// on its own line.
    fn drop_torn_tail(&self, file: &fs::File) -> Result<()> {
        let content = fs::read(&self.path)?;
        if content.is_empty() || content.ends_with(b"\n") {
            return Ok(());
        }
        let keep = content
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        warn!(
            "truncating incomplete trailing row in {}",
            self.path.display()
        );
        file.set_len(keep as u64)?;
        Ok(())
    }

    /// All samples in append order; a missing file is an empty store.
    ///
    /// A final line without a trailing newline is a torn append from a
    /// crash and is skipped.
    pub fn load(&self) -> Result<Vec<LabeledSample>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let complete = match content.rfind('\n') {
            Some(end) => &content[..=end],
            None => "",
        };
        if complete.len() < content.len() {
            warn!(
                "ignoring incomplete trailing row in {}",
                self.path.display()
            );
        }

        let mut samples = Vec::new();
        for (line_idx, line) in complete.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (line_idx == 0 && line.starts_with(FEATURE_COLUMNS[0])) {
                continue;
            }
            samples.push(parse_row(line, line_idx + 1)?);
        }

        Ok(samples)
    }

    /// Number of stored samples
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn parse_row(line: &str, line_no: usize) -> Result<LabeledSample> {
    let corrupted = |what: &str| {
        RegistryError::Corrupted(format!("{} line {}: {}", INCREMENTAL_FILE, line_no, what))
    };

    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != FEATURE_COUNT + 1 {
        return Err(corrupted(&format!(
            "expected {} columns, got {}",
            FEATURE_COUNT + 1,
            parts.len()
        )));
    }

    let values = parts[..FEATURE_COUNT]
        .iter()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|_| corrupted("invalid number"))?;
    let features = FeatureVector::from_slice(&values)?;

    let label = parts[FEATURE_COUNT]
        .parse::<u8>()
        .ok()
        .and_then(|v| Potability::try_from(v).ok())
        .ok_or_else(|| corrupted("invalid label"))?;

    Ok(LabeledSample::new(features, label))
}
