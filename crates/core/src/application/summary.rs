// Summary aggregation
//
// Reduces the per-prediction result tables of several algorithms to one
// value per (target type, metric, algorithm).

use crate::application::evaluation::Stage;
use crate::domain::{Direction, Frame, MetricType, RowRef, SuccessCriterion, TargetType};
use crate::error::Result;
use crate::port::TableStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PAIR_COLUMNS: [&str; 2] = ["interface_chain_id_1", "interface_chain_id_2"];

/// Settings for one summary run
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub evaluation_dir: PathBuf,
    pub targets_dir: PathBuf,
    pub algorithms: Vec<String>,
    pub targets: Vec<TargetType>,
    pub metric_type: MetricType,
}

impl SummaryConfig {
    fn raw_table(&self, algorithm: &str, target: TargetType, stage: Stage) -> PathBuf {
        self.evaluation_dir
            .join(algorithm)
            .join("raw")
            .join(format!("{}_{}.csv", target, stage.as_str()))
    }
}

/// One (target, metric) line of the summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub target: TargetType,
    pub metric: &'static str,
    /// One value per algorithm, in `SummaryTable::algorithms` order
    pub values: Vec<Option<f64>>,
}

/// Wide summary table: target, metric, one column per algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub algorithms: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Rows of one target type, in table order
    pub fn rows_for(&self, target: TargetType) -> impl Iterator<Item = &SummaryRow> {
        self.rows.iter().filter(move |r| r.target == target)
    }

    /// Target types present in the table, in table order
    pub fn targets(&self) -> Vec<TargetType> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.target) {
                seen.push(row.target);
            }
        }
        seen
    }

    pub fn to_frame(&self) -> Result<Frame> {
        let mut columns = vec!["target".to_string(), "metric".to_string()];
        columns.extend(self.algorithms.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.target.to_string(), row.metric.to_string()];
                cells.extend(
                    row.values
                        .iter()
                        .map(|v| v.map(|v| format!("{:.2}", v)).unwrap_or_default()),
                );
                cells
            })
            .collect();

        Ok(Frame::from_rows(columns, rows)?)
    }
}

/// Per-target metric values of one algorithm
type TargetScores = HashMap<&'static str, f64>;

/// Summary service
pub struct SummaryService {
    store: Arc<dyn TableStore>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Build the wide summary table for every algorithm and target type
    pub fn summarize(&self, config: &SummaryConfig) -> Result<SummaryTable> {
        let mut per_algorithm: Vec<HashMap<TargetType, TargetScores>> = Vec::new();

        for algorithm in &config.algorithms {
            let mut scores = HashMap::new();
            for &target in &config.targets {
                if let Some(target_scores) = self.score_target(config, algorithm, target)? {
                    scores.insert(target, target_scores);
                }
            }
            per_algorithm.push(scores);
        }

        let mut rows = Vec::new();
        for target in TargetType::ALL {
            if !config.targets.contains(&target) {
                continue;
            }
            for &metric in target.summary_metrics() {
                let values: Vec<Option<f64>> = per_algorithm
                    .iter()
                    .map(|scores| {
                        scores
                            .get(&target)
                            .and_then(|s| s.get(metric))
                            .map(|v| round2(*v))
                    })
                    .collect();
                if values.iter().any(Option::is_some) {
                    rows.push(SummaryRow {
                        target,
                        metric,
                        values,
                    });
                }
            }
        }

        Ok(SummaryTable {
            algorithms: config.algorithms.clone(),
            rows,
        })
    }

    /// Write the wide table as CSV
    pub fn save(&self, table: &SummaryTable, path: &Path) -> Result<()> {
        self.store.save(path, &table.to_frame()?)?;
        info!(path = %path.display(), rows = table.rows.len(), "Wrote summary table");
        Ok(())
    }

    /// Scores of one algorithm on one target type; `None` when there is no result table
    fn score_target(
        &self,
        config: &SummaryConfig,
        algorithm: &str,
        target: TargetType,
    ) -> Result<Option<TargetScores>> {
        let result_path = config.raw_table(algorithm, target, Stage::Ost);
        if !self.store.exists(&result_path) {
            warn!(algorithm, target = %target, path = %result_path.display(), "Result table not found");
            return Ok(None);
        }
        let target_path = config.targets_dir.join(format!("{}.csv", target));
        if !self.store.exists(&target_path) {
            warn!(target = %target, path = %target_path.display(), "Target table not found");
            return Ok(None);
        }

        let mut target_rows = self.store.load(&target_path)?;
        normalize_chain_columns(&mut target_rows);
        debug!(target = %target, targets = target_rows.len(), "Loaded target table");

        let results = self.load_results(&result_path, &target_rows)?;
        let metric_type = config.metric_type;
        let mut scores = TargetScores::new();
        let mut put = |metric: &'static str, value: Option<f64>| {
            if let Some(v) = value {
                scores.insert(metric, v);
            }
        };

        if target == TargetType::InterfaceProteinLigand {
            put(
                "rmsd_lddt-pli_success_rate",
                success_rate(&results, SuccessCriterion::RmsdLddtPli, metric_type),
            );
            put("lddt-lp", score_average(&results, "lddt-lp", metric_type));
            put("lddt-pli", score_average(&results, "lddt-pli", metric_type));
        } else if target.is_monomer() {
            let gdt = first_column(&results, &["gdt_ts", "gdt-ts"]);
            let tm = first_column(&results, &["tm-score", "tm_score"]);
            put("gdt-ts", gdt.and_then(|c| score_average(&results, c, metric_type)));
            put("tm-score", tm.and_then(|c| score_average(&results, c, metric_type)));
            put("rmsd", score_average(&results, "rmsd", metric_type));
            put("lddt", score_average(&results, "lddt", metric_type));
        } else {
            put("lddt", score_average(&results, "lddt", metric_type));

            let interface_scores = if target.needs_dockq() {
                let dockq_path = config.raw_table(algorithm, target, Stage::Dockq);
                if self.store.exists(&dockq_path) {
                    Some(self.load_results(&dockq_path, &target_rows)?)
                } else {
                    warn!(algorithm, target = %target, "DockQ table not found, interface scores omitted");
                    None
                }
            } else {
                Some(results)
            };

            if let Some(table) = interface_scores {
                put(
                    "dockq_score_success_rate",
                    success_rate(&table, SuccessCriterion::DockQ, metric_type),
                );
                put("irmsd", score_average(&table, "irmsd", metric_type));
                put("lrmsd", score_average(&table, "lrmsd", metric_type));
            }
        }

        info!(algorithm, target = %target, metrics = scores.len(), "Scored target");
        Ok(Some(scores))
    }

    fn load_results(&self, path: &Path, target_rows: &Frame) -> Result<Frame> {
        let mut results = self.store.load(path)?;
        normalize_chain_columns(&mut results);
        let kept = overlap(&results, target_rows);
        debug!(path = %path.display(), rows = results.len(), kept = kept.len(), "Filtered to benchmark targets");
        Ok(kept)
    }
}

/// Rename `native_chain_id_1/2` to `interface_chain_id_1/2` when both exist
pub fn normalize_chain_columns(frame: &mut Frame) {
    if frame.has_column("native_chain_id_1") && frame.has_column("native_chain_id_2") {
        frame.rename_columns(&[
            ("native_chain_id_1", PAIR_COLUMNS[0]),
            ("native_chain_id_2", PAIR_COLUMNS[1]),
        ]);
    }
}

fn is_paired(frame: &Frame) -> bool {
    PAIR_COLUMNS.iter().all(|c| frame.has_column(c))
}

/// Grouping key of a row: `pdb_id` plus the interface chains when paired
fn group_key(row: &RowRef<'_>, paired: bool) -> Vec<String> {
    let mut key = vec![row.get("pdb_id").unwrap_or_default().to_string()];
    if paired {
        key.extend(
            PAIR_COLUMNS
                .iter()
                .map(|c| row.get(c).unwrap_or_default().to_string()),
        );
    }
    key
}

/// Result rows whose key also occurs in the target table
pub fn overlap(results: &Frame, targets: &Frame) -> Frame {
    let paired = is_paired(results);
    let known: std::collections::HashSet<Vec<String>> =
        targets.rows().map(|row| group_key(&row, paired)).collect();
    results.filter(|row| known.contains(&group_key(row, paired)))
}

/// How the representative row of a group is chosen
#[derive(Debug, Clone, Copy)]
enum Selection<'c> {
    Rank,
    Metric(&'c str, Direction),
}

impl<'c> Selection<'c> {
    fn for_metric(metric_type: MetricType, column: &'c str) -> Option<Self> {
        match metric_type {
            MetricType::Rank => Some(Selection::Rank),
            MetricType::Best => Direction::of(column).map(|d| Selection::Metric(column, d)),
        }
    }

    fn column(&self) -> &'c str {
        match self {
            Selection::Rank => "ranking_score",
            Selection::Metric(column, _) => column,
        }
    }

    fn direction(&self) -> Direction {
        match self {
            Selection::Rank => Direction::HigherIsBetter,
            Selection::Metric(_, direction) => *direction,
        }
    }
}

/// One representative row per group
///
/// Groups keep first-appearance order; ties keep the earliest row; rows
/// without the selection value are ignored.
fn best_rows<'f>(rows: &[RowRef<'f>], selection: Selection<'_>, paired: bool) -> Vec<RowRef<'f>> {
    let column = selection.column();
    let direction = selection.direction();
    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    let mut best: Vec<(RowRef<'f>, f64)> = Vec::new();

    for row in rows {
        let Some(value) = row.get_f64(column) else {
            continue;
        };
        let key = group_key(row, paired);
        match slots.get(&key) {
            Some(&slot) => {
                if direction.improves(value, best[slot].1) {
                    best[slot] = (*row, value);
                }
            }
            None => {
                slots.insert(key, best.len());
                best.push((*row, value));
            }
        }
    }
    best.into_iter().map(|(row, _)| row).collect()
}

/// Rows that have every column in `columns`
fn rows_with<'f>(frame: &'f Frame, columns: &[&str]) -> Vec<RowRef<'f>> {
    frame
        .rows()
        .filter(|row| columns.iter().all(|c| row.get_f64(c).is_some()))
        .collect()
}

/// Percentage of groups whose representative row meets `criterion`
pub fn success_rate(
    frame: &Frame,
    criterion: SuccessCriterion,
    metric_type: MetricType,
) -> Option<f64> {
    let required = criterion.required_columns();
    let candidates = rows_with(frame, required);
    let selection = Selection::for_metric(metric_type, criterion.selection_column())?;
    let best = best_rows(&candidates, selection, is_paired(frame));
    if best.is_empty() {
        return None;
    }

    let successes = best
        .iter()
        .filter(|row| {
            let values: Vec<f64> = required.iter().filter_map(|c| row.get_f64(c)).collect();
            criterion.is_success(&values)
        })
        .count();
    Some(successes as f64 / best.len() as f64 * 100.0)
}

/// Mean of `column` over the representative row of each group
pub fn score_average(frame: &Frame, column: &str, metric_type: MetricType) -> Option<f64> {
    if !frame.has_column(column) {
        return None;
    }
    let candidates = rows_with(frame, &[column]);
    let selection = Selection::for_metric(metric_type, column)?;
    let values: Vec<f64> = best_rows(&candidates, selection, is_paired(frame))
        .iter()
        .filter_map(|row| row.get_f64(column))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn first_column<'c>(frame: &Frame, candidates: &[&'c str]) -> Option<&'c str> {
    candidates.iter().copied().find(|c| frame.has_column(c))
}

/// Two decimals, exact halves to even
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::table_store::mocks::InMemoryTableStore;

    fn frame(columns: &[&str], rows: &[&[&str]]) -> Frame {
        Frame::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn interface_results() -> Frame {
        frame(
            &[
                "pdb_id",
                "interface_chain_id_1",
                "interface_chain_id_2",
                "ranking_score",
                "dockq_score",
                "irmsd",
            ],
            &[
                &["1abc", "A", "B", "0.9", "0.10", "5.0"],
                &["1abc", "A", "B", "0.5", "0.80", "1.0"],
                &["2xyz", "A", "C", "0.7", "0.30", "2.0"],
                &["2xyz", "A", "C", "0.7", "0.05", "9.0"],
                &["3def", "A", "B", "0.4", "", ""],
            ],
        )
    }

    #[test]
    fn test_rank_selection_uses_ranking_score_and_first_tie() {
        let results = interface_results();

        // 1abc -> 0.10 (fail), 2xyz tie -> first row 0.30 (pass)
        let rate = success_rate(&results, SuccessCriterion::DockQ, MetricType::Rank).unwrap();
        assert_eq!(rate, 50.0);

        let irmsd = score_average(&results, "irmsd", MetricType::Rank).unwrap();
        assert_eq!(irmsd, 3.5);
    }

    #[test]
    fn test_best_selection_follows_metric_direction() {
        let results = interface_results();

        let rate = success_rate(&results, SuccessCriterion::DockQ, MetricType::Best).unwrap();
        assert_eq!(rate, 100.0);

        let irmsd = score_average(&results, "irmsd", MetricType::Best).unwrap();
        assert_eq!(irmsd, 1.5);
    }

    #[test]
    fn test_ligand_success_needs_both_values() {
        let results = frame(
            &["pdb_id", "ranking_score", "rmsd", "lddt-pli"],
            &[
                &["1lig", "0.9", "1.5", "0.85"],
                &["2lig", "0.9", "1.5", "0.70"],
                &["3lig", "0.9", "1.0", ""],
            ],
        );
        let rate =
            success_rate(&results, SuccessCriterion::RmsdLddtPli, MetricType::Rank).unwrap();
        assert_eq!(rate, 50.0);
    }

    #[test]
    fn test_empty_sets_are_none() {
        let results = frame(&["pdb_id", "ranking_score", "rmsd"], &[&["1abc", "0.1", ""]]);
        assert_eq!(score_average(&results, "rmsd", MetricType::Rank), None);
        assert_eq!(score_average(&results, "lddt", MetricType::Rank), None);
        assert_eq!(
            success_rate(&results, SuccessCriterion::Rmsd, MetricType::Best),
            None
        );
    }

    #[test]
    fn test_overlap_filters_by_interface_key() {
        let mut results = frame(
            &["pdb_id", "native_chain_id_1", "native_chain_id_2"],
            &[&["1abc", "A", "B"], &["1abc", "A", "C"], &["9zzz", "A", "B"]],
        );
        normalize_chain_columns(&mut results);
        let targets = frame(
            &["pdb_id", "interface_chain_id_1", "interface_chain_id_2"],
            &[&["1abc", "A", "B"]],
        );

        let kept = overlap(&results, &targets);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.row(0).unwrap().get("interface_chain_id_2"), Some("B"));
    }

    fn summary_fixture() -> (Arc<InMemoryTableStore>, SummaryConfig) {
        let store = Arc::new(InMemoryTableStore::new());
        let config = SummaryConfig {
            evaluation_dir: PathBuf::from("/eval"),
            targets_dir: PathBuf::from("/targets"),
            algorithms: vec!["Alpha".to_string(), "Beta".to_string()],
            targets: vec![TargetType::InterfaceProteinDna, TargetType::MonomerProtein],
            metric_type: MetricType::Rank,
        };

        store.insert(
            "/targets/interface_protein_dna.csv",
            frame(
                &["pdb_id", "native_chain_id_1", "native_chain_id_2"],
                &[&["1dna", "A", "C"]],
            ),
        );
        store.insert(
            "/targets/monomer_protein.csv",
            frame(&["pdb_id", "chain_id"], &[&["1mon", "A"], &["2mon", "A"]]),
        );

        store.insert(
            "/eval/Alpha/raw/interface_protein_dna_ost.csv",
            frame(
                &["pdb_id", "native_chain_id_1", "native_chain_id_2", "ranking_score", "lddt", "dockq_score", "irmsd", "lrmsd"],
                &[&["1dna", "A", "C", "0.8", "0.756", "0.01", "9.0", "9.0"]],
            ),
        );
        store.insert(
            "/eval/Alpha/raw/interface_protein_dna_dockqv2.csv",
            frame(
                &["pdb_id", "native_chain_id_1", "native_chain_id_2", "ranking_score", "dockq_score", "irmsd", "lrmsd"],
                &[&["1dna", "A", "C", "0.8", "0.5", "1.234", "3.0"]],
            ),
        );
        store.insert(
            "/eval/Alpha/raw/monomer_protein_ost.csv",
            frame(
                &["pdb_id", "chain_id", "ranking_score", "gdt_ts", "tm_score", "rmsd", "lddt"],
                &[
                    &["1mon", "A", "0.9", "0.8", "0.9", "1.0", "0.7"],
                    &["2mon", "A", "0.9", "0.6", "0.7", "3.0", "0.5"],
                    &["7out", "A", "0.9", "0.0", "0.0", "99.0", "0.0"],
                ],
            ),
        );
        // Beta only has a monomer table, without the DockQ side file
        store.insert(
            "/eval/Beta/raw/monomer_protein_ost.csv",
            frame(
                &["pdb_id", "chain_id", "ranking_score", "gdt-ts", "tm-score", "rmsd", "lddt"],
                &[&["1mon", "A", "0.9", "0.5", "0.5", "2.0", "0.5"]],
            ),
        );
        (store, config)
    }

    #[test]
    fn test_summarize_wide_table() {
        let (store, config) = summary_fixture();
        let service = SummaryService::new(store);

        let table = service.summarize(&config).unwrap();

        let dna: Vec<_> = table.rows_for(TargetType::InterfaceProteinDna).collect();
        let metrics: Vec<&str> = dna.iter().map(|r| r.metric).collect();
        assert_eq!(metrics, vec!["dockq_score_success_rate", "irmsd", "lrmsd", "lddt"]);
        // DockQ values come from the dockqv2 table
        assert_eq!(dna[0].values, vec![Some(100.0), None]);
        assert_eq!(dna[1].values, vec![Some(1.23), None]);
        assert_eq!(dna[3].values, vec![Some(0.76), None]);

        let mono: Vec<_> = table.rows_for(TargetType::MonomerProtein).collect();
        assert_eq!(mono[0].metric, "gdt-ts");
        assert_eq!(mono[0].values, vec![Some(0.7), Some(0.5)]);
        assert_eq!(mono[2].metric, "rmsd");
        assert_eq!(mono[2].values, vec![Some(2.0), Some(2.0)]);

        assert_eq!(
            table.targets(),
            vec![TargetType::InterfaceProteinDna, TargetType::MonomerProtein]
        );
    }

    #[test]
    fn test_summary_frame_layout() {
        let (store, config) = summary_fixture();
        let service = SummaryService::new(store.clone());
        let table = service.summarize(&config).unwrap();

        service.save(&table, Path::new("/out/summary.csv")).unwrap();
        let written = store.get(Path::new("/out/summary.csv")).unwrap();

        assert_eq!(written.columns(), &["target", "metric", "Alpha", "Beta"]);
        let first = written.row(0).unwrap();
        assert_eq!(first.get("target"), Some("interface_protein_dna"));
        assert_eq!(first.get("Alpha"), Some("100.00"));
        assert_eq!(first.get("Beta"), None);
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        // 1 success out of 32 entries
        assert_eq!(round2(100.0 / 32.0), 3.12);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(66.666), 66.67);
    }

    #[test]
    fn test_ragged_summary_is_not_written() {
        let store = Arc::new(InMemoryTableStore::new());
        let service = SummaryService::new(store.clone());
        let table = SummaryTable {
            algorithms: vec!["Alpha".to_string(), "Beta".to_string()],
            rows: vec![SummaryRow {
                target: TargetType::MonomerProtein,
                metric: "lddt",
                values: vec![Some(0.8)],
            }],
        };

        assert!(table.to_frame().is_err());
        assert!(service.save(&table, Path::new("/out/summary.csv")).is_err());
        assert!(store.get(Path::new("/out/summary.csv")).is_none());
    }
}
