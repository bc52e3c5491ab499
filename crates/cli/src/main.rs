//! foldbench CLI - structure-prediction benchmark evaluation
//!
//! `evaluate` scores predictions with `ost` / DockQ, `summary` aggregates
//! the result tables, `collect` builds an algorithm's prediction summary.

mod logging;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use foldbench_core::application::collect::{DEFAULT_FILE_SUFFIX, DEFAULT_SEEDS};
use foldbench_core::application::worker::constants::{
    DEFAULT_ALLOWED_MISMATCHES, DEFAULT_DOCKQ_WORKERS, DEFAULT_OST_WORKERS,
};
use foldbench_core::application::{
    shutdown_channel, CollectConfig, CollectService, EvaluationConfig, EvaluationService,
    SummaryConfig, SummaryService,
};
use foldbench_core::domain::{MetricType, TargetType};
use foldbench_core::port::system_probe::{SystemProbe, DEFAULT_CPU_FRACTION};
use foldbench_core::port::time_provider::SystemTimeProvider;
use foldbench_infra_fs::{CsvTableStore, SeedSampleLayout};
use foldbench_infra_system::{OstDockqTool, SystemProbeImpl, ToolConfig};

const DEFAULT_TARGETS_DIR: &str = "./targets";
const DEFAULT_EVALUATION_DIR: &str = "./outputs/evaluation";
const DEFAULT_GROUND_TRUTH_DIR: &str = "./ground_truths";
const DEFAULT_ALGORITHM: &str = "Protenix";
const DEFAULT_SUMMARY_PATH: &str = "./summary_table.csv";
const DEFAULT_TARGETS: [&str; 4] = [
    "interface_protein_ligand",
    "interface_antibody_antigen",
    "interface_protein_dna",
    "monomer_protein",
];

#[derive(Parser)]
#[command(name = "foldbench")]
#[command(about = "Structure-prediction benchmark evaluation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log format: pretty or json
    #[arg(long, global = true, env = "FOLDBENCH_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an algorithm's predictions against the ground truth
    Evaluate(EvaluateArgs),

    /// Aggregate result tables of several algorithms into a summary table
    Summary(SummaryArgs),

    /// Build the prediction summary from a prediction directory
    Collect(CollectArgs),
}

#[derive(Args)]
struct EvaluateArgs {
    /// Directory with `{target_type}.csv` target tables
    #[arg(long, env = "FOLDBENCH_TARGETS_DIR", default_value = DEFAULT_TARGETS_DIR)]
    targets_dir: String,

    /// Directory with one sub-directory per algorithm
    #[arg(long, env = "FOLDBENCH_EVALUATION_DIR", default_value = DEFAULT_EVALUATION_DIR)]
    evaluation_dir: String,

    /// Directory with `{pdb_id}.cif` reference structures
    #[arg(long, env = "FOLDBENCH_GROUND_TRUTH_DIR", default_value = DEFAULT_GROUND_TRUTH_DIR)]
    ground_truth_dir: String,

    #[arg(long, env = "FOLDBENCH_ALGORITHM", default_value = DEFAULT_ALGORITHM)]
    algorithm_name: String,

    /// Prediction summary CSV (default: `{evaluation_dir}/{algorithm}/prediction_reference.csv`)
    #[arg(long, env = "FOLDBENCH_PREDICTION_SUMMARY")]
    prediction_summary: Option<String>,

    /// Target types to evaluate
    #[arg(long, num_args = 1.., default_values = DEFAULT_TARGETS)]
    targets: Vec<String>,

    #[arg(long, env = "FOLDBENCH_OST_WORKERS", default_value_t = DEFAULT_OST_WORKERS)]
    ost_workers: usize,

    #[arg(long, env = "FOLDBENCH_DOCKQ_WORKERS", default_value_t = DEFAULT_DOCKQ_WORKERS)]
    dockq_workers: usize,

    /// Workers reading detail files back (default: 80% of logical CPUs)
    #[arg(long, env = "FOLDBENCH_EXTRACT_WORKERS")]
    extract_workers: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_ALLOWED_MISMATCHES)]
    allowed_mismatches: u32,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args)]
struct ToolArgs {
    /// OpenStructure executable
    #[arg(long, env = "FOLDBENCH_OST", default_value = "ost")]
    ost_executable: String,

    /// DockQ v2 executable
    #[arg(long, env = "FOLDBENCH_DOCKQ", default_value = "DockQ")]
    dockq_executable: String,

    /// Per-run limit in seconds, 0 disables it
    #[arg(long, env = "FOLDBENCH_TOOL_TIMEOUT_SECS", default_value_t = 1800)]
    tool_timeout_secs: u64,

    /// Seconds between SIGTERM and SIGKILL for a timed-out run
    #[arg(long, env = "FOLDBENCH_KILL_GRACE_SECS", default_value_t = 5)]
    kill_grace_secs: u64,

    /// Extra environment variables passed to the tools
    #[arg(long = "pass-env", env = "FOLDBENCH_PASS_ENV", value_delimiter = ',')]
    pass_env: Vec<String>,
}

impl ToolArgs {
    fn into_config(self) -> ToolConfig {
        let mut config = ToolConfig {
            ost_executable: expand(&self.ost_executable),
            dockq_executable: expand(&self.dockq_executable),
            timeout: (self.tool_timeout_secs > 0)
                .then(|| Duration::from_secs(self.tool_timeout_secs)),
            graceful_timeout_ms: (self.kill_grace_secs * 1000) as i64,
            ..ToolConfig::default()
        };
        for var in self.pass_env {
            if !config.env_allowlist.contains(&var) {
                config.env_allowlist.push(var);
            }
        }
        config
    }
}

#[derive(Args)]
struct SummaryArgs {
    #[arg(long, env = "FOLDBENCH_EVALUATION_DIR", default_value = DEFAULT_EVALUATION_DIR)]
    evaluation_dir: String,

    #[arg(long, env = "FOLDBENCH_TARGETS_DIR", default_value = DEFAULT_TARGETS_DIR)]
    targets_dir: String,

    /// Output CSV path
    #[arg(long, default_value = DEFAULT_SUMMARY_PATH)]
    output_path: String,

    /// Algorithms to compare, one column each
    #[arg(long, num_args = 1.., default_values = [DEFAULT_ALGORITHM])]
    algorithm_names: Vec<String>,

    #[arg(long, num_args = 1.., default_values = DEFAULT_TARGETS)]
    targets: Vec<String>,

    /// rank (highest ranking_score) or best (oracle)
    #[arg(long, default_value = "rank")]
    metric_type: String,
}

#[derive(Args)]
struct CollectArgs {
    /// JSON array of inputs with a `name` field
    #[arg(long)]
    inputs: String,

    /// Directory with `{name}/seed_{seed}/predictions/`
    #[arg(long)]
    prediction_dir: String,

    #[arg(long, env = "FOLDBENCH_EVALUATION_DIR", default_value = DEFAULT_EVALUATION_DIR)]
    evaluation_dir: String,

    #[arg(long, env = "FOLDBENCH_ALGORITHM", default_value = DEFAULT_ALGORITHM)]
    algorithm_name: String,

    #[arg(long, num_args = 1.., default_values = DEFAULT_SEEDS)]
    seeds: Vec<String>,

    /// Samples drawn per seed
    #[arg(long, default_value_t = 5)]
    samples: u32,

    /// Structure file suffix
    #[arg(long, default_value = DEFAULT_FILE_SUFFIX)]
    file_suffix: String,

    /// Output CSV (default: `{evaluation_dir}/{algorithm}/prediction_reference.csv`)
    #[arg(long)]
    output: Option<String>,
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(expand(path))
}

fn parse_targets(names: &[String]) -> Result<Vec<TargetType>> {
    names
        .iter()
        .map(|name| name.parse::<TargetType>().map_err(anyhow::Error::from))
        .collect()
}

async fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let targets = parse_targets(&args.targets)?;

    let mut config = EvaluationConfig::new(
        expand_path(&args.targets_dir),
        expand_path(&args.evaluation_dir),
        &args.algorithm_name,
        expand_path(&args.ground_truth_dir),
    );
    if let Some(summary) = &args.prediction_summary {
        config.prediction_summary = expand_path(summary);
    }
    config.targets = targets;
    config.ost_workers = args.ost_workers;
    config.dockq_workers = args.dockq_workers;
    config.allowed_mismatches = args.allowed_mismatches;

    let probe = SystemProbeImpl::new();
    let metrics = probe.get_metrics().await;
    config.extract_workers = args
        .extract_workers
        .unwrap_or_else(|| metrics.worker_budget(DEFAULT_CPU_FRACTION));
    info!(
        cpus = metrics.cpu_count,
        memory_total_mb = metrics.memory_total_mb,
        extract_workers = config.extract_workers,
        "Host resources"
    );

    let tool_config = args.tools.into_config();
    info!(
        ost = %tool_config.ost_executable,
        dockq = %tool_config.dockq_executable,
        timeout = ?tool_config.timeout,
        "Scoring tools"
    );
    let tool = Arc::new(OstDockqTool::new(tool_config, Arc::new(SystemTimeProvider)));
    let store = Arc::new(CsvTableStore::new());

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, finishing running jobs");
            shutdown_tx.shutdown();
        }
    });

    let service = EvaluationService::new(tool, store, shutdown_rx.clone());
    let reports = service
        .evaluate(&config)
        .await
        .with_context(|| format!("Evaluation of {} failed", args.algorithm_name))?;

    if shutdown_rx.is_shutdown() {
        println!(
            "{}",
            format!("⚠ Evaluation of {} interrupted", args.algorithm_name)
                .yellow()
                .bold()
        );
        println!();
        println!("{}", render::stage_reports(&reports));
        anyhow::bail!("interrupted; rerun to resume from the existing detail files");
    }

    println!(
        "{}",
        format!("✓ Evaluated {}", args.algorithm_name).green().bold()
    );
    println!();
    println!("{}", render::stage_reports(&reports));
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let config = SummaryConfig {
        evaluation_dir: expand_path(&args.evaluation_dir),
        targets_dir: expand_path(&args.targets_dir),
        algorithms: args.algorithm_names,
        targets: parse_targets(&args.targets)?,
        metric_type: args.metric_type.parse::<MetricType>()?,
    };

    let service = SummaryService::new(Arc::new(CsvTableStore::new()));
    let table = service.summarize(&config).context("Summary failed")?;
    let output = expand_path(&args.output_path);
    service
        .save(&table, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{}", render::summary(&table));
    Ok(())
}

fn run_collect(args: CollectArgs) -> Result<()> {
    let output = match &args.output {
        Some(path) => expand_path(path),
        None => expand_path(&args.evaluation_dir)
            .join(&args.algorithm_name)
            .join("prediction_reference.csv"),
    };
    let mut config = CollectConfig::new(
        expand_path(&args.inputs),
        expand_path(&args.prediction_dir),
        output,
    );
    config.seeds = args.seeds;
    config.samples = (0..args.samples).collect();
    config.file_suffix = args.file_suffix;

    let service = CollectService::new(
        Arc::new(SeedSampleLayout::new()),
        Arc::new(CsvTableStore::new()),
    );
    let records = service.collect(&config).context("Collect failed")?;

    println!("{}", render::collected(&records));
    println!("  {} {}", "Written:".bold(), config.output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_format)?;
    info!("foldbench v{} starting", foldbench_core::VERSION);

    match cli.command {
        Commands::Evaluate(args) => run_evaluate(args).await,
        Commands::Summary(args) => run_summary(args),
        Commands::Collect(args) => run_collect(args),
    }
}
