// Scoring task and prediction records

use super::frame::{Record, RowRef};
use super::target::ScoringMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chain pair a metric is read for
///
/// Monomers use the same chain on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainPair {
    pub first: String,
    pub second: String,
}

impl ChainPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Resolve the chain pair from a row
    ///
    /// Lookup order: `interface_chain_id_*`, `native_chain_id_*`, `chain_id`.
    pub fn from_row(row: &RowRef<'_>) -> Option<Self> {
        for (a, b) in [
            ("interface_chain_id_1", "interface_chain_id_2"),
            ("native_chain_id_1", "native_chain_id_2"),
        ] {
            if let (Some(first), Some(second)) = (row.get(a), row.get(b)) {
                return Some(Self::new(first, second));
            }
        }
        row.get("chain_id").map(|c| Self::new(c, c))
    }

    /// Interface pair only; `chain_id` is not accepted
    pub fn interface_from_row(row: &RowRef<'_>) -> Option<Self> {
        if has_pair_columns(row) {
            Self::from_row(row)
        } else {
            None
        }
    }
}

fn has_pair_columns(row: &RowRef<'_>) -> bool {
    (row.get("interface_chain_id_1").is_some() && row.get("interface_chain_id_2").is_some())
        || (row.get("native_chain_id_1").is_some() && row.get("native_chain_id_2").is_some())
}

/// One prediction produced by an algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub pdb_id: String,
    pub seed: String,
    pub sample: u32,
    pub ranking_score: f64,
    pub prediction_path: PathBuf,
}

impl PredictionRecord {
    pub const COLUMNS: [&'static str; 5] =
        ["pdb_id", "seed", "sample", "ranking_score", "prediction_path"];

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set("pdb_id", self.pdb_id.clone());
        record.set("seed", self.seed.clone());
        record.set("sample", self.sample.to_string());
        record.set("ranking_score", self.ranking_score.to_string());
        record.set("prediction_path", self.prediction_path.display().to_string());
        record
    }
}

/// One unit of scoring work derived from a merged target/prediction row
#[derive(Debug, Clone)]
pub struct ScoringTask {
    pub row_index: usize,
    pub pdb_id: String,
    pub seed: String,
    pub sample: String,
    pub prediction_path: Option<PathBuf>,
    pub reference_path: PathBuf,
    pub chains: Option<ChainPair>,
    pub mode: ScoringMode,
}

impl ScoringTask {
    /// Build a task from a merged row
    ///
    /// Missing seed/sample cells stay empty so the row can still be reported.
    pub fn from_row(row: &RowRef<'_>, ground_truth_dir: &Path, mode: ScoringMode) -> Option<Self> {
        let pdb_id = row.get("pdb_id")?.to_string();
        Some(Self {
            row_index: row.index(),
            reference_path: ground_truth_dir.join(format!("{}.cif", pdb_id)),
            seed: row.get("seed").unwrap_or_default().to_string(),
            sample: row.get("sample").unwrap_or_default().to_string(),
            prediction_path: row.get("prediction_path").map(PathBuf::from),
            chains: ChainPair::from_row(row),
            pdb_id,
            mode,
        })
    }

    /// Prediction file, if the row has one and it exists on disk
    pub fn existing_prediction(&self) -> Option<&Path> {
        self.prediction_path
            .as_deref()
            .filter(|p| p.exists())
    }

    /// `{pdb}_{seed}_{sample}_{mode}_ost.json`
    pub fn ost_detail_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_ost.json",
            self.pdb_id, self.seed, self.sample, self.mode
        )
    }

    /// `{pdb}_{seed}_{sample}_{c1}_{c2}_{mode}_dockqv2.json`
    pub fn dockq_detail_name(&self, chains: &ChainPair) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_dockqv2.json",
            self.pdb_id, self.seed, self.sample, chains.first, chains.second, self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frame;

    fn one_row(columns: &[&str], values: &[&str]) -> Frame {
        Frame::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![values.iter().map(|c| c.to_string()).collect()],
        )
        .unwrap()
    }

    #[test]
    fn test_chain_pair_lookup_order() {
        let f = one_row(
            &["pdb_id", "native_chain_id_1", "native_chain_id_2", "chain_id"],
            &["1abc", "A", "B", "C"],
        );
        assert_eq!(
            ChainPair::from_row(&f.row(0).unwrap()),
            Some(ChainPair::new("A", "B"))
        );

        let f = one_row(&["pdb_id", "chain_id"], &["1abc", "C"]);
        let row = f.row(0).unwrap();
        assert_eq!(ChainPair::from_row(&row), Some(ChainPair::new("C", "C")));
        assert_eq!(ChainPair::interface_from_row(&row), None);
    }

    #[test]
    fn test_detail_names() {
        let f = one_row(
            &["pdb_id", "seed", "sample", "interface_chain_id_1", "interface_chain_id_2"],
            &["7xyz", "42", "3", "A", "L"],
        );
        let task =
            ScoringTask::from_row(&f.row(0).unwrap(), Path::new("/gt"), ScoringMode::Ligand)
                .unwrap();

        assert_eq!(task.reference_path, PathBuf::from("/gt/7xyz.cif"));
        assert_eq!(task.ost_detail_name(), "7xyz_42_3_ligand_ost.json");
        assert_eq!(
            task.dockq_detail_name(&ChainPair::new("A", "L")),
            "7xyz_42_3_A_L_ligand_dockqv2.json"
        );
        assert!(task.existing_prediction().is_none());
    }
}
