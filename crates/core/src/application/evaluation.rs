// Evaluation orchestration
//
// Fans per-target, per-seed, per-sample scoring jobs out to the external
// tools, then reads the tools' detail files back into one result table per
// target type.

use crate::application::extract::{self, DockqScores, LigandScores, StructureScores};
use crate::application::worker::constants::{
    DEFAULT_ALLOWED_MISMATCHES, DEFAULT_DOCKQ_WORKERS, DEFAULT_OST_WORKERS,
};
use crate::application::worker::{JobOutcome, ShutdownToken, WorkerPool};
use crate::domain::{ChainPair, Frame, Record, ScoringMode, ScoringTask, TargetType};
use crate::error::Result;
use crate::port::{
    ComparisonRequest, DockqRequest, ScoringTool, TableStore, ToolError, ToolOutcome, ToolStatus,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings for one evaluation run of one algorithm
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Directory holding `{target_type}.csv`
    pub targets_dir: PathBuf,
    /// `{evaluation_dir}/{algorithm}`; `raw/` and `detail/` live below it
    pub algorithm_dir: PathBuf,
    /// Directory holding `{pdb_id}.cif` references
    pub ground_truth_dir: PathBuf,
    /// Prediction summary (`pdb_id, seed, sample, ranking_score, prediction_path`)
    pub prediction_summary: PathBuf,
    pub targets: Vec<TargetType>,
    pub ost_workers: usize,
    pub dockq_workers: usize,
    /// Workers for reading detail files back
    pub extract_workers: usize,
    pub allowed_mismatches: u32,
}

impl EvaluationConfig {
    pub fn new(
        targets_dir: impl Into<PathBuf>,
        evaluation_dir: impl AsRef<Path>,
        algorithm: &str,
        ground_truth_dir: impl Into<PathBuf>,
    ) -> Self {
        let algorithm_dir = evaluation_dir.as_ref().join(algorithm);
        Self {
            targets_dir: targets_dir.into(),
            prediction_summary: algorithm_dir.join("prediction_reference.csv"),
            algorithm_dir,
            ground_truth_dir: ground_truth_dir.into(),
            targets: TargetType::DEFAULTS.to_vec(),
            ost_workers: DEFAULT_OST_WORKERS,
            dockq_workers: DEFAULT_DOCKQ_WORKERS,
            extract_workers: DEFAULT_OST_WORKERS,
            allowed_mismatches: DEFAULT_ALLOWED_MISMATCHES,
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.algorithm_dir.join("raw")
    }

    pub fn detail_dir(&self) -> PathBuf {
        self.algorithm_dir.join("detail")
    }

    pub fn target_table(&self, target: TargetType) -> PathBuf {
        self.targets_dir.join(format!("{}.csv", target))
    }
}

/// Which tool produced a result table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ost,
    Dockq,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ost => "ost",
            Stage::Dockq => "dockqv2",
        }
    }
}

/// Counters for one stage of one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub target: TargetType,
    pub stage: Stage,
    /// Tool runs that exited successfully
    pub scored: usize,
    /// Detail files reused from an earlier run
    pub cached: usize,
    /// Rows whose prediction file is absent
    pub missing_prediction: usize,
    /// Tool runs that failed, timed out or panicked
    pub failed: usize,
    /// Rows written to the result table
    pub rows: usize,
    /// Shutdown cut the scoring pass short; no table was written
    pub interrupted: bool,
    pub output: PathBuf,
}

impl StageReport {
    fn new(target: TargetType, stage: Stage, output: PathBuf) -> Self {
        Self {
            target,
            stage,
            scored: 0,
            cached: 0,
            missing_prediction: 0,
            failed: 0,
            rows: 0,
            interrupted: false,
            output,
        }
    }
}

/// One tool invocation to be scheduled
#[derive(Debug, Clone)]
enum ToolJob {
    Structures(ComparisonRequest),
    Ligands(ComparisonRequest),
    Dockq(DockqRequest),
}

impl ToolJob {
    fn output(&self) -> &Path {
        match self {
            ToolJob::Structures(r) | ToolJob::Ligands(r) => &r.output,
            ToolJob::Dockq(r) => &r.output,
        }
    }

    async fn run(self, tool: Arc<dyn ScoringTool>) -> std::result::Result<ToolOutcome, ToolError> {
        match &self {
            ToolJob::Structures(r) => tool.compare_structures(r).await,
            ToolJob::Ligands(r) => tool.compare_ligands(r).await,
            ToolJob::Dockq(r) => tool.dockq(r).await,
        }
    }
}

/// Evaluation service
pub struct EvaluationService {
    tool: Arc<dyn ScoringTool>,
    store: Arc<dyn TableStore>,
    shutdown: ShutdownToken,
}

impl EvaluationService {
    pub fn new(
        tool: Arc<dyn ScoringTool>,
        store: Arc<dyn TableStore>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            tool,
            store,
            shutdown,
        }
    }

    /// Score every requested target type for one algorithm
    ///
    /// Target types whose table is missing are skipped with a warning.
    pub async fn evaluate(&self, config: &EvaluationConfig) -> Result<Vec<StageReport>> {
        tokio::fs::create_dir_all(config.raw_dir()).await?;
        tokio::fs::create_dir_all(config.detail_dir()).await?;

        let predictions = self.store.load(&config.prediction_summary)?;
        info!(
            path = %config.prediction_summary.display(),
            predictions = predictions.len(),
            "Loaded prediction summary"
        );

        let mut reports = Vec::new();
        for &target in &config.targets {
            if self.shutdown.is_shutdown() {
                warn!(target = %target, "Shutdown requested, skipping remaining targets");
                break;
            }

            let table_path = config.target_table(target);
            if !self.store.exists(&table_path) {
                warn!(target = %target, path = %table_path.display(), "Target table not found, skipping");
                continue;
            }

            let targets = self.store.load(&table_path)?;
            let merged = targets.left_join(&predictions, "pdb_id")?;
            info!(target = %target, targets = targets.len(), rows = merged.len(), "Evaluating target");

            let ost = self.eval_by_ost(&merged, target, config).await?;
            let interrupted = ost.interrupted;
            reports.push(ost);
            if target.needs_dockq() && !interrupted && !self.shutdown.is_shutdown() {
                reports.push(self.eval_by_dockq(&merged, target, config).await?);
            }
        }
        Ok(reports)
    }

    /// OST scoring for one target type; writes `raw/{target}_ost.csv`
    pub async fn eval_by_ost(
        &self,
        merged: &Frame,
        target: TargetType,
        config: &EvaluationConfig,
    ) -> Result<StageReport> {
        let mode = target.scoring_mode();
        let detail_dir = config.detail_dir();
        let output = config.raw_dir().join(format!("{}_{}.csv", target, Stage::Ost.as_str()));
        let mut report = StageReport::new(target, Stage::Ost, output.clone());

        let tasks = build_tasks(merged, &config.ground_truth_dir, mode);

        // Scoring pass: one tool run per detail file
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        for task in &tasks {
            let detail = detail_dir.join(task.ost_detail_name());
            if !seen.insert(detail.clone()) {
                continue;
            }
            let Some(prediction) = task.existing_prediction() else {
                warn!(
                    pdb_id = %task.pdb_id,
                    seed = %task.seed,
                    sample = %task.sample,
                    "Prediction file missing, not scoring"
                );
                report.missing_prediction += 1;
                continue;
            };
            if detail.exists() {
                debug!(path = %detail.display(), "Detail file exists, reusing");
                report.cached += 1;
                continue;
            }
            let request = ComparisonRequest {
                model: prediction.to_path_buf(),
                reference: task.reference_path.clone(),
                output: detail,
            };
            jobs.push(match mode {
                ScoringMode::Structure => ToolJob::Structures(request),
                ScoringMode::Ligand => ToolJob::Ligands(request),
            });
        }
        self.run_tool_jobs(
            format!("{}:ost", target),
            config.ost_workers,
            jobs,
            &mut report,
        )
        .await;
        if report.interrupted {
            warn!(target = %target, path = %output.display(), "OST scoring interrupted, result table left untouched");
            return Ok(report);
        }

        // Extraction pass: read every detail file back into its row.
        // Local reads only, so it runs to completion even after shutdown.
        let pool = WorkerPool::new(
            format!("{}:ost-extract", target),
            config.extract_workers,
            ShutdownToken::never(),
        );
        let items: Vec<(Record, ScoringTask, PathBuf)> = tasks
            .into_iter()
            .filter(|t| t.existing_prediction().is_some())
            .map(|t| {
                let record = merged
                    .row(t.row_index)
                    .map(|r| r.to_record())
                    .unwrap_or_default();
                let detail = detail_dir.join(t.ost_detail_name());
                (record, t, detail)
            })
            .collect();

        let outcomes = pool
            .run(items, |(mut record, task, detail)| async move {
                extract_ost_row(&mut record, &task, &detail).await;
                record
            })
            .await;

        let metric_columns: &[&str] = match mode {
            ScoringMode::Structure => &StructureScores::COLUMNS,
            ScoringMode::Ligand => &LigandScores::COLUMNS,
        };
        let mut result = result_frame(merged, metric_columns);
        for outcome in outcomes {
            if let JobOutcome::Done(record) = outcome {
                result.push_record(&record);
            }
        }
        report.rows = result.len();

        self.store.save(&output, &result)?;
        info!(
            target = %target,
            rows = report.rows,
            path = %output.display(),
            "Wrote OST results"
        );
        Ok(report)
    }

    /// DockQ v2 scoring for one nucleic-acid interface type;
    /// writes `raw/{target}_dockqv2.csv`
    pub async fn eval_by_dockq(
        &self,
        merged: &Frame,
        target: TargetType,
        config: &EvaluationConfig,
    ) -> Result<StageReport> {
        let mode = target.scoring_mode();
        let detail_dir = config.detail_dir();
        let output = config
            .raw_dir()
            .join(format!("{}_{}.csv", target, Stage::Dockq.as_str()));
        let mut report = StageReport::new(target, Stage::Dockq, output.clone());

        let mut scorable: Vec<(ScoringTask, ChainPair, PathBuf)> = Vec::new();
        for row in merged.rows() {
            let Some(task) = ScoringTask::from_row(&row, &config.ground_truth_dir, mode) else {
                continue;
            };
            let Some(chains) = ChainPair::interface_from_row(&row) else {
                warn!(pdb_id = %task.pdb_id, "Row has no interface chain pair, skipping DockQ");
                continue;
            };
            if task.existing_prediction().is_none() {
                warn!(
                    pdb_id = %task.pdb_id,
                    seed = %task.seed,
                    sample = %task.sample,
                    "Prediction file missing, not scoring"
                );
                report.missing_prediction += 1;
                continue;
            }
            let detail = detail_dir.join(task.dockq_detail_name(&chains));
            scorable.push((task, chains, detail));
        }

        // Scoring pass: one DockQ run per detail file
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        for (task, chains, detail) in &scorable {
            if !seen.insert(detail.clone()) {
                continue;
            }
            if detail.exists() {
                report.cached += 1;
                continue;
            }
            let Some(prediction) = task.existing_prediction() else {
                continue;
            };
            jobs.push(ToolJob::Dockq(DockqRequest {
                model: prediction.to_path_buf(),
                native: task.reference_path.clone(),
                native_chains: vec![chains.first.clone(), chains.second.clone()],
                small_molecule: mode == ScoringMode::Ligand,
                allowed_mismatches: config.allowed_mismatches,
                output: detail.clone(),
            }));
        }
        self.run_tool_jobs(
            format!("{}:dockq", target),
            config.dockq_workers,
            jobs,
            &mut report,
        )
        .await;
        if report.interrupted {
            warn!(target = %target, path = %output.display(), "DockQ scoring interrupted, result table left untouched");
            return Ok(report);
        }

        // Extraction pass: rows without a usable report are dropped
        let pool = WorkerPool::new(
            format!("{}:dockq-extract", target),
            config.extract_workers,
            ShutdownToken::never(),
        );
        let items: Vec<(Record, ScoringTask, PathBuf)> = scorable
            .into_iter()
            .map(|(task, _, detail)| {
                let record = merged
                    .row(task.row_index)
                    .map(|r| r.to_record())
                    .unwrap_or_default();
                (record, task, detail)
            })
            .collect();

        let outcomes = pool
            .run(items, |(mut record, task, detail)| async move {
                extract_dockq_row(&mut record, &task, &detail)
                    .await
                    .then_some(record)
            })
            .await;

        let mut result = result_frame(merged, &DockqScores::COLUMNS);
        for record in outcomes.into_iter().filter_map(|o| o.into_done().flatten()) {
            result.push_record(&record);
        }
        report.rows = result.len();

        self.store.save(&output, &result)?;
        info!(
            target = %target,
            rows = report.rows,
            path = %output.display(),
            "Wrote DockQ results"
        );
        Ok(report)
    }

    async fn run_tool_jobs(
        &self,
        label: String,
        workers: usize,
        jobs: Vec<ToolJob>,
        report: &mut StageReport,
    ) {
        if jobs.is_empty() {
            return;
        }
        let pool = WorkerPool::new(label, workers, self.shutdown.clone());
        let tool = Arc::clone(&self.tool);
        let outputs: Vec<PathBuf> = jobs.iter().map(|j| j.output().to_path_buf()).collect();

        let outcomes = pool
            .run(jobs, move |job| job.run(Arc::clone(&tool)))
            .await;

        for (outcome, output) in outcomes.into_iter().zip(outputs) {
            match outcome {
                JobOutcome::Done(Ok(result)) if result.status == ToolStatus::Success => {
                    report.scored += 1;
                }
                JobOutcome::Done(Ok(result)) => {
                    warn!(
                        output = %output.display(),
                        exit_code = ?result.exit_code,
                        stderr = %tail(result.stderr.as_deref().unwrap_or_default()),
                        "Scoring tool exited with failure"
                    );
                    report.failed += 1;
                }
                JobOutcome::Done(Err(e)) => {
                    warn!(output = %output.display(), error = %e, "Scoring tool error");
                    report.failed += 1;
                }
                JobOutcome::Panicked(msg) => {
                    warn!(output = %output.display(), panic_msg = %msg, "Scoring job panicked");
                    report.failed += 1;
                }
                JobOutcome::Cancelled => {
                    debug!(output = %output.display(), "Scoring job cancelled");
                    report.interrupted = true;
                }
            }
        }
    }
}

/// Tasks for every row with a `pdb_id`, in row order
fn build_tasks(merged: &Frame, ground_truth_dir: &Path, mode: ScoringMode) -> Vec<ScoringTask> {
    merged
        .rows()
        .filter_map(|row| {
            let task = ScoringTask::from_row(&row, ground_truth_dir, mode);
            if task.is_none() {
                warn!(row = row.index(), "Row has no pdb_id, skipping");
            }
            task
        })
        .collect()
}

/// Empty result table: the merged columns followed by the metric columns
fn result_frame(merged: &Frame, metric_columns: &[&str]) -> Frame {
    let mut columns = merged.columns().to_vec();
    for column in metric_columns {
        if !merged.has_column(column) {
            columns.push(column.to_string());
        }
    }
    Frame::new(columns)
}

/// Append OST metric columns to `record`; metrics stay empty when unreadable
async fn extract_ost_row(record: &mut Record, task: &ScoringTask, detail: &Path) {
    let doc = match extract::read_detail(detail).await {
        Ok(Some(doc)) => Some(doc),
        Ok(None) => {
            warn!(path = %detail.display(), "Detail file not found");
            None
        }
        Err(e) => {
            warn!(path = %detail.display(), error = %e, "Detail file unreadable");
            None
        }
    };

    let chains = task.chains.as_ref();
    if doc.is_some() && chains.is_none() {
        warn!(pdb_id = %task.pdb_id, "No chain ids in row, chain scores left empty");
    }
    match task.mode {
        ScoringMode::Structure => {
            let scores = doc
                .as_ref()
                .map(|doc| extract::structure_scores(doc, chains))
                .unwrap_or_default();
            scores.write_to(record);
        }
        ScoringMode::Ligand => {
            let scores = match (&doc, chains) {
                (Some(doc), Some(chains)) => extract::ligand_scores(doc, chains),
                _ => LigandScores::default(),
            };
            scores.write_to(record);
        }
    }
}

/// Append DockQ columns to `record`; false when the row must be dropped
async fn extract_dockq_row(record: &mut Record, task: &ScoringTask, detail: &Path) -> bool {
    let doc = match extract::read_detail(detail).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            warn!(pdb_id = %task.pdb_id, path = %detail.display(), "DockQ report missing");
            return false;
        }
        Err(e) => {
            warn!(pdb_id = %task.pdb_id, error = %e, "DockQ report unreadable");
            return false;
        }
    };

    match extract::dockq_scores(&doc) {
        Some(scores) => {
            debug!(pdb_id = %task.pdb_id, interface = %scores.interface, "DockQ interface selected");
            scores.write_to(record);
            true
        }
        None => {
            warn!(pdb_id = %task.pdb_id, path = %detail.display(), "DockQ report has no usable result");
            false
        }
    }
}

/// Last few lines of tool stderr for log lines
fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}
