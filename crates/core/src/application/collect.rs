// Prediction collection
//
// Builds the prediction summary table (`pdb_id, seed, sample,
// ranking_score, prediction_path`) that evaluation merges with targets.

use crate::domain::{Frame, PredictionRecord};
use crate::error::{AppError, Result};
use crate::port::{PredictionQuery, PredictionSource, TableStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Seeds every algorithm is run with
pub const DEFAULT_SEEDS: [&str; 5] = ["42", "66", "101", "2024", "8888"];

/// Samples drawn per seed
pub const DEFAULT_SAMPLES: std::ops::Range<u32> = 0..5;

/// Structure file suffix written by the postprocess step
pub const DEFAULT_FILE_SUFFIX: &str = "_postprocessed";

/// One entry of the algorithm inputs file
#[derive(Debug, Clone, Deserialize)]
struct InputEntry {
    name: String,
}

/// Settings for one collection run
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// JSON array of objects with a `name` field
    pub inputs: PathBuf,
    pub prediction_dir: PathBuf,
    pub seeds: Vec<String>,
    pub samples: Vec<u32>,
    pub file_suffix: String,
    pub output: PathBuf,
}

impl CollectConfig {
    pub fn new(
        inputs: impl Into<PathBuf>,
        prediction_dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inputs: inputs.into(),
            prediction_dir: prediction_dir.into(),
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            samples: DEFAULT_SAMPLES.collect(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            output: output.into(),
        }
    }
}

/// Collect service
pub struct CollectService {
    source: Arc<dyn PredictionSource>,
    store: Arc<dyn TableStore>,
}

impl CollectService {
    pub fn new(source: Arc<dyn PredictionSource>, store: Arc<dyn TableStore>) -> Self {
        Self { source, store }
    }

    /// Scan predictions for every input name and write the summary table
    pub fn collect(&self, config: &CollectConfig) -> Result<Vec<PredictionRecord>> {
        let names = read_input_names(&config.inputs)?;
        info!(inputs = names.len(), dir = %config.prediction_dir.display(), "Collecting predictions");

        let query = PredictionQuery {
            prediction_dir: config.prediction_dir.clone(),
            names,
            seeds: config.seeds.clone(),
            samples: config.samples.clone(),
            file_suffix: config.file_suffix.clone(),
        };
        let records = self.source.collect(&query);
        if records.is_empty() {
            warn!(dir = %config.prediction_dir.display(), "No predictions found");
        }

        let mut frame = Frame::new(
            PredictionRecord::COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for record in &records {
            frame.push_record(&record.to_record());
        }
        self.store.save(&config.output, &frame)?;

        info!(
            predictions = records.len(),
            path = %config.output.display(),
            "Wrote prediction summary"
        );
        Ok(records)
    }
}

fn read_input_names(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let entries: Vec<InputEntry> = serde_json::from_slice(&bytes)?;
    Ok(entries.into_iter().map(|e| e.name).collect())
}
