// Prediction directory scanner
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use foldbench_core::domain::PredictionRecord;
use foldbench_core::port::prediction_source::{PredictionQuery, PredictionSource};
use foldbench_core::port::StoreError;

/// `{dir}/{name}/seed_{seed}/predictions/` layout
///
/// Structures are `{name}_seed_{seed}_sample_{k}{suffix}.cif`; the ranking
/// score comes from `{name}_seed_{seed}_summary_confidence_sample_{k}.json`.
#[derive(Debug, Clone, Default)]
pub struct SeedSampleLayout;

impl SeedSampleLayout {
    pub fn new() -> Self {
        Self
    }

    fn predictions_dir(root: &Path, name: &str, seed: &str) -> PathBuf {
        root.join(name)
            .join(format!("seed_{}", seed))
            .join("predictions")
    }

    pub fn structure_path(query: &PredictionQuery, name: &str, seed: &str, sample: u32) -> PathBuf {
        Self::predictions_dir(&query.prediction_dir, name, seed).join(format!(
            "{}_seed_{}_sample_{}{}.cif",
            name, seed, sample, query.file_suffix
        ))
    }

    pub fn confidence_path(query: &PredictionQuery, name: &str, seed: &str, sample: u32) -> PathBuf {
        Self::predictions_dir(&query.prediction_dir, name, seed).join(format!(
            "{}_seed_{}_summary_confidence_sample_{}.json",
            name, seed, sample
        ))
    }
}

/// `ranking_score` of a confidence file, 0 when the key is absent
fn read_ranking_score(path: &Path) -> Result<f64, StoreError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound(path.display().to_string()),
        _ => StoreError::Io(format!("{}: {}", path.display(), e)),
    })?;
    let doc: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(doc
        .get("ranking_score")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0))
}

impl PredictionSource for SeedSampleLayout {
    fn collect(&self, query: &PredictionQuery) -> Vec<PredictionRecord> {
        let mut records = Vec::new();

        for name in &query.names {
            for seed in &query.seeds {
                for &sample in &query.samples {
                    let structure = Self::structure_path(query, name, seed, sample);
                    if !structure.is_file() {
                        debug!(path = %structure.display(), "Prediction not found");
                        continue;
                    }

                    let confidence = Self::confidence_path(query, name, seed, sample);
                    let ranking_score = match read_ranking_score(&confidence) {
                        Ok(score) => score,
                        Err(e) => {
                            warn!(path = %confidence.display(), error = %e, "Confidence file unreadable, skipping prediction");
                            continue;
                        }
                    };

                    records.push(PredictionRecord {
                        pdb_id: name.clone(),
                        seed: seed.clone(),
                        sample,
                        ranking_score,
                        prediction_path: structure,
                    });
                }
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(dir: &Path) -> PredictionQuery {
        PredictionQuery {
            prediction_dir: dir.to_path_buf(),
            names: vec!["1abc".to_string()],
            seeds: vec!["42".to_string(), "66".to_string()],
            samples: vec![0, 1],
            file_suffix: "_postprocessed".to_string(),
        }
    }

    fn write(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_collect_reads_ranking_scores() {
        let dir = tempfile::tempdir().unwrap();
        let q = query(dir.path());

        write(&SeedSampleLayout::structure_path(&q, "1abc", "42", 0), "data_");
        write(
            &SeedSampleLayout::confidence_path(&q, "1abc", "42", 0),
            r#"{"ranking_score": 0.93, "ptm": 0.8}"#,
        );
        write(&SeedSampleLayout::structure_path(&q, "1abc", "66", 1), "data_");
        write(&SeedSampleLayout::confidence_path(&q, "1abc", "66", 1), r#"{"ptm": 0.5}"#);

        let records = SeedSampleLayout::new().collect(&q);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ranking_score, 0.93);
        assert_eq!(records[0].seed, "42");
        assert!(records[0]
            .prediction_path
            .ends_with("1abc/seed_42/predictions/1abc_seed_42_sample_0_postprocessed.cif"));
        assert_eq!(records[1].sample, 1);
        assert_eq!(records[1].ranking_score, 0.0);
    }

    #[test]
    fn test_unreadable_confidence_skips_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let q = query(dir.path());

        write(&SeedSampleLayout::structure_path(&q, "1abc", "42", 0), "data_");
        write(&SeedSampleLayout::confidence_path(&q, "1abc", "42", 0), "not json");
        write(&SeedSampleLayout::structure_path(&q, "1abc", "42", 1), "data_");

        assert!(SeedSampleLayout::new().collect(&q).is_empty());
    }

    #[test]
    fn test_ranking_score_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        write(&bad, "{\"ranking_score\": ");

        assert!(matches!(
            read_ranking_score(&dir.path().join("absent.json")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            read_ranking_score(&bad),
            Err(StoreError::Malformed { .. })
        ));
    }
}
