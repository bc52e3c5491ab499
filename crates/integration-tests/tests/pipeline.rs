//! End-to-end: collect -> evaluate -> summary against fake scoring tools

#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::Bench;
use foldbench_core::application::{
    CollectConfig, CollectService, EvaluationConfig, EvaluationService, ShutdownToken, Stage,
    SummaryConfig, SummaryService,
};
use foldbench_core::domain::{MetricType, TargetType};
use foldbench_core::port::time_provider::SystemTimeProvider;
use foldbench_core::port::TableStore;
use foldbench_infra_fs::{CsvTableStore, SeedSampleLayout};
use foldbench_infra_system::{OstDockqTool, ToolConfig};

fn tool(bench: &Bench) -> Arc<OstDockqTool> {
    let config = ToolConfig {
        ost_executable: bench.fake_ost(),
        dockq_executable: bench.fake_dockq(),
        ..ToolConfig::default()
    };
    Arc::new(OstDockqTool::new(config, Arc::new(SystemTimeProvider)))
}

fn seed_bench() -> Bench {
    let bench = Bench::new();
    bench.write(
        "targets/interface_protein_dna.csv",
        "pdb_id,native_chain_id_1,native_chain_id_2\n7dna,A,C\n",
    );
    bench.write("targets/monomer_protein.csv", "pdb_id,chain_id\n8mon,A\n");
    bench.write(
        "targets/interface_protein_ligand.csv",
        "pdb_id,interface_chain_id_1,interface_chain_id_2\n9lig,A,L\n",
    );
    bench.write(
        "inputs.json",
        r#"[{"name": "7dna"}, {"name": "8mon"}, {"name": "9lig"}]"#,
    );

    bench.prediction("7dna", "42", 0, 0.9);
    bench.prediction("7dna", "42", 1, 0.4);
    bench.prediction("8mon", "42", 0, 0.7);
    bench.prediction("9lig", "42", 0, 0.5);
    bench
}

#[tokio::test]
async fn test_full_pipeline() {
    let bench = seed_bench();
    let store = Arc::new(CsvTableStore::new());

    // Collect
    let mut collect = CollectConfig::new(
        bench.path("inputs.json"),
        bench.path("preds"),
        bench.path("eval/Fake/prediction_reference.csv"),
    );
    collect.seeds = vec!["42".to_string()];
    let records = CollectService::new(Arc::new(SeedSampleLayout::new()), store.clone())
        .collect(&collect)
        .unwrap();
    assert_eq!(records.len(), 4);

    // Evaluate
    let mut config = EvaluationConfig::new(
        bench.path("targets"),
        bench.path("eval"),
        "Fake",
        bench.path("gt"),
    );
    config.targets = vec![
        TargetType::InterfaceProteinDna,
        TargetType::MonomerProtein,
        TargetType::InterfaceProteinLigand,
    ];
    config.ost_workers = 2;
    config.dockq_workers = 2;
    config.extract_workers = 2;

    let service = EvaluationService::new(tool(&bench), store.clone(), ShutdownToken::never());
    let reports = service.evaluate(&config).await.unwrap();

    let stages: Vec<(TargetType, Stage, usize)> =
        reports.iter().map(|r| (r.target, r.stage, r.rows)).collect();
    assert_eq!(
        stages,
        vec![
            (TargetType::InterfaceProteinDna, Stage::Ost, 2),
            (TargetType::InterfaceProteinDna, Stage::Dockq, 2),
            (TargetType::MonomerProtein, Stage::Ost, 1),
            (TargetType::InterfaceProteinLigand, Stage::Ost, 1),
        ]
    );
    assert!(reports.iter().all(|r| r.failed == 0));

    let ligand = store
        .load(&bench.path("eval/Fake/raw/interface_protein_ligand_ost.csv"))
        .unwrap();
    assert_eq!(ligand.row(0).unwrap().get_f64("lddt-pli"), Some(0.88));
    assert!(common::exists(
        &bench.path("eval/Fake/detail/7dna_42_1_A_C_structure_dockqv2.json")
    ));

    // Second run reuses every detail file
    let rerun = service.evaluate(&config).await.unwrap();
    assert!(rerun.iter().all(|r| r.scored == 0 && r.cached > 0));

    // Summary
    let summary = SummaryService::new(store.clone());
    let table = summary
        .summarize(&SummaryConfig {
            evaluation_dir: bench.path("eval"),
            targets_dir: bench.path("targets"),
            algorithms: vec!["Fake".to_string()],
            targets: config.targets.clone(),
            metric_type: MetricType::Rank,
        })
        .unwrap();
    summary
        .save(&table, &bench.path("summary_table.csv"))
        .unwrap();

    let written = store.load(&bench.path("summary_table.csv")).unwrap();
    let lookup = |target: &str, metric: &str| -> Option<String> {
        written
            .rows()
            .find(|r| r.get("target") == Some(target) && r.get("metric") == Some(metric))
            .and_then(|r| r.get("Fake").map(str::to_string))
    };

    assert_eq!(
        lookup("interface_protein_ligand", "rmsd_lddt-pli_success_rate").as_deref(),
        Some("100.00")
    );
    assert_eq!(
        lookup("interface_protein_dna", "irmsd").as_deref(),
        Some("1.20")
    );
    assert_eq!(lookup("interface_protein_dna", "lddt").as_deref(), Some("0.80"));
    assert_eq!(lookup("monomer_protein", "gdt-ts").as_deref(), Some("0.70"));
    assert_eq!(lookup("monomer_protein", "tm-score").as_deref(), Some("0.90"));

    // Ligand target rows come first, as in the fixed table order
    assert_eq!(
        written.row(0).unwrap().get("target"),
        Some("interface_protein_ligand")
    );
}
