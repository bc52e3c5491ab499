// Prediction Source Port
// Discovery of an algorithm's prediction files and confidence scores

use crate::domain::PredictionRecord;
use std::path::PathBuf;

/// Where and what to look for
#[derive(Debug, Clone)]
pub struct PredictionQuery {
    pub prediction_dir: PathBuf,
    pub names: Vec<String>,
    pub seeds: Vec<String>,
    pub samples: Vec<u32>,
    /// Suffix of the structure file stem, e.g. `_postprocessed`
    pub file_suffix: String,
}

/// Prediction source trait
///
/// Implementations:
/// - SeedSampleLayout: `{name}/seed_{seed}/predictions/...` directory scan
pub trait PredictionSource: Send + Sync {
    /// Records for every prediction file found; missing files are skipped
    fn collect(&self, query: &PredictionQuery) -> Vec<PredictionRecord>;
}
