//! CSV dataset loading
//!
//! Reads the water-quality table (nine measurement columns plus
//! `Potability`). A header row is optional; when present, columns are
//! matched by name so their order in the file does not matter.

use potability_ai_core::{LabeledSample, Potability, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN};
use std::path::Path;

use crate::errors::{Result, TrainerError};

/// Training dataset: unscaled feature rows and their labels
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<Potability>,
}

/// Per-feature minimum and maximum
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureStats {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

impl Dataset {
    /// Load dataset from CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::Dataset(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_csv_str(&content)
    }

    /// Parse CSV text
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut dataset = Dataset::default();
        // Column position of each feature, then of the label.
        let mut layout: Option<[usize; FEATURE_COUNT + 1]> = None;

        for (line_idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();

            let columns = match layout {
                Some(columns) => columns,
                None if parts[0].parse::<f64>().is_err() => {
                    layout = Some(header_layout(&parts, line_idx + 1)?);
                    continue;
                }
                None => {
                    let columns = positional_layout();
                    layout = Some(columns);
                    columns
                }
            };

            if parts.len() < FEATURE_COUNT + 1 {
                return Err(TrainerError::Dataset(format!(
                    "line {}: expected {} columns, got {}",
                    line_idx + 1,
                    FEATURE_COUNT + 1,
                    parts.len()
                )));
            }

            let mut row = Vec::with_capacity(FEATURE_COUNT);
            for (name, &col) in FEATURE_COLUMNS.iter().zip(&columns[..FEATURE_COUNT]) {
                let value = parts
                    .get(col)
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        TrainerError::Dataset(format!(
                            "line {}, column {}: invalid number",
                            line_idx + 1,
                            name
                        ))
                    })?;
                row.push(value);
            }

            let label = parts
                .get(columns[FEATURE_COUNT])
                .and_then(|s| parse_label(s))
                .ok_or_else(|| {
                    TrainerError::Dataset(format!("line {}: invalid label", line_idx + 1))
                })?;

            dataset.features.push(row);
            dataset.labels.push(label);
        }

        if dataset.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".to_string()));
        }

        Ok(dataset)
    }

    /// Build from labelled samples
    pub fn from_samples(samples: &[LabeledSample]) -> Self {
        let mut dataset = Dataset::default();
        dataset.extend_samples(samples);
        dataset
    }

    /// Append one labelled sample
    pub fn push_sample(&mut self, sample: &LabeledSample) {
        self.features.push(sample.features.to_array().to_vec());
        self.labels.push(sample.label);
    }

    pub fn extend_samples(&mut self, samples: &[LabeledSample]) {
        for sample in samples {
            self.push_sample(sample);
        }
    }

    /// Rows selected by index, in the given order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Row width (0 when empty)
    pub fn feature_count(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// `[not potable, potable]` counts
    pub fn class_counts(&self) -> [usize; 2] {
        let potable = self
            .labels
            .iter()
            .filter(|&&l| l == Potability::Potable)
            .count();
        [self.labels.len() - potable, potable]
    }

    /// Get feature statistics for validation
    pub fn feature_stats(&self) -> Vec<FeatureStats> {
        let mut stats: Vec<FeatureStats> = FEATURE_COLUMNS
            .iter()
            .take(self.feature_count())
            .map(|&name| FeatureStats {
                name,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            })
            .collect();

        for row in &self.features {
            for (stat, &val) in stats.iter_mut().zip(row) {
                stat.min = stat.min.min(val);
                stat.max = stat.max.max(val);
            }
        }

        stats
    }
}

fn positional_layout() -> [usize; FEATURE_COUNT + 1] {
    let mut columns = [0; FEATURE_COUNT + 1];
    for (i, col) in columns.iter_mut().enumerate() {
        *col = i;
    }
    columns
}

fn header_layout(header: &[&str], line: usize) -> Result<[usize; FEATURE_COUNT + 1]> {
    let mut columns = [0; FEATURE_COUNT + 1];
    let names = FEATURE_COLUMNS.iter().chain(std::iter::once(&LABEL_COLUMN));

    for (slot, name) in columns.iter_mut().zip(names) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                TrainerError::Dataset(format!("line {}: header is missing column {}", line, name))
            })?;
    }

    Ok(columns)
}

fn parse_label(raw: &str) -> Option<Potability> {
    let value = raw.parse::<f64>().ok()?;
    if value == 0.0 {
        Some(Potability::NotPotable)
    } else if value == 1.0 {
        Some(Potability::Potable)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "ph,Hardness,Solids,Chloramines,Sulfate,Conductivity,Organic_carbon,Trihalomethanes,Turbidity,Potability";

    fn create_test_csv() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{HEADER}")?;
        writeln!(file, "7.0,200,20000,7.5,350,400,14,70,4,1")?;
        writeln!(file, "5.5,150,15000,6.5,300,350,12,60,3,0")?;
        writeln!(file, "8.1,250,25000,8.5,400,450,16,80,5,1.0")?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_csv_with_header() -> Result<()> {
        let file = create_test_csv()?;
        let dataset = Dataset::from_csv(file.path())?;

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_count(), 9);
        assert_eq!(dataset.features[0][0], 7.0);
        assert_eq!(dataset.labels[0], Potability::Potable);
        assert_eq!(dataset.class_counts(), [1, 2]);

        Ok(())
    }

    #[test]
    fn header_columns_may_be_reordered() -> Result<()> {
        let content = "Potability,Turbidity,Trihalomethanes,Organic_carbon,Conductivity,Sulfate,Chloramines,Solids,Hardness,ph\n\
                       0,4,70,14,400,350,7.5,20000,200,7.0\n";
        let dataset = Dataset::from_csv_str(content)?;

        assert_eq!(dataset.features[0][0], 7.0);
        assert_eq!(dataset.features[0][8], 4.0);
        assert_eq!(dataset.labels[0], Potability::NotPotable);

        Ok(())
    }

    #[test]
    fn headerless_rows_are_positional() -> Result<()> {
        let dataset = Dataset::from_csv_str("1,2,3,4,5,6,7,8,9,0\n")?;
        assert_eq!(dataset.features[0], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        Ok(())
    }

    #[test]
    fn rejects_missing_values_and_bad_labels() {
        let missing = format!("{HEADER}\n7.0,,20000,7.5,350,400,14,70,4,1\n");
        assert!(Dataset::from_csv_str(&missing).is_err());

        let bad_label = format!("{HEADER}\n7.0,200,20000,7.5,350,400,14,70,4,2\n");
        assert!(Dataset::from_csv_str(&bad_label).is_err());

        assert!(Dataset::from_csv_str(HEADER).is_err());
    }

    #[test]
    fn test_feature_stats() -> Result<()> {
        let file = create_test_csv()?;
        let dataset = Dataset::from_csv(file.path())?;

        let stats = dataset.feature_stats();
        assert_eq!(stats.len(), 9);
        assert_eq!(stats[0].name, "ph");
        assert_eq!((stats[0].min, stats[0].max), (5.5, 8.1));

        Ok(())
    }

    #[test]
    fn subset_preserves_requested_order() -> Result<()> {
        let file = create_test_csv()?;
        let dataset = Dataset::from_csv(file.path())?;

        let picked = dataset.subset(&[2, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.features[0][0], 8.1);
        assert_eq!(picked.features[1][0], 7.0);

        Ok(())
    }
}
