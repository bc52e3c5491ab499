// Terminal rendering of run reports
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::{object::Columns, Alignment, Style};
use tabled::{Table, Tabled};

use foldbench_core::application::{StageReport, SummaryTable};
use foldbench_core::domain::PredictionRecord;

#[derive(Tabled)]
struct StageRow {
    target: String,
    stage: &'static str,
    scored: usize,
    cached: usize,
    missing: usize,
    failed: usize,
    rows: String,
}

impl From<&StageReport> for StageRow {
    fn from(report: &StageReport) -> Self {
        Self {
            target: report.target.to_string(),
            stage: report.stage.as_str(),
            scored: report.scored,
            cached: report.cached,
            missing: report.missing_prediction,
            failed: report.failed,
            rows: if report.interrupted {
                "interrupted".to_string()
            } else {
                report.rows.to_string()
            },
        }
    }
}

pub fn stage_reports(reports: &[StageReport]) -> String {
    let rows: Vec<StageRow> = reports.iter().map(StageRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

fn value_cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Per target: an upper-cased heading and a `Metric | algorithm...` table
pub fn summary(table: &SummaryTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Results Summary:".cyan().bold()));

    for target in table.targets() {
        out.push('\n');
        out.push_str(&format!("{}\n", target.as_str().to_uppercase().bold()));

        let mut builder = Builder::default();
        let mut header = vec!["Metric".to_string()];
        header.extend(table.algorithms.iter().cloned());
        builder.push_record(header);

        for row in table.rows_for(target) {
            let mut record = vec![row.metric.to_string()];
            record.extend(row.values.iter().map(|v| value_cell(*v)));
            builder.push_record(record);
        }

        let mut rendered = builder.build();
        rendered
            .with(Style::psql())
            .modify(Columns::new(1..), Alignment::right());
        out.push_str(&rendered.to_string());
        out.push('\n');
    }
    out
}

pub fn collected(records: &[PredictionRecord]) -> String {
    let entries: std::collections::BTreeSet<&str> =
        records.iter().map(|r| r.pdb_id.as_str()).collect();
    format!(
        "{} {} predictions for {} entries",
        "✓".green().bold(),
        records.len(),
        entries.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldbench_core::application::summary::SummaryRow;
    use foldbench_core::domain::TargetType;

    #[test]
    fn test_summary_shows_na_for_missing_values() {
        colored::control::set_override(false);
        let table = SummaryTable {
            algorithms: vec!["Alpha".to_string(), "Beta".to_string()],
            rows: vec![SummaryRow {
                target: TargetType::MonomerProtein,
                metric: "lddt",
                values: vec![Some(0.8), None],
            }],
        };

        let rendered = summary(&table);

        assert!(rendered.contains("MONOMER_PROTEIN"));
        assert!(rendered.contains("0.80"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_interrupted_stage_shows_no_row_count() {
        let report = StageReport {
            target: TargetType::MonomerProtein,
            stage: foldbench_core::application::Stage::Ost,
            scored: 3,
            cached: 0,
            missing_prediction: 0,
            failed: 0,
            rows: 0,
            interrupted: true,
            output: "raw/monomer_protein_ost.csv".into(),
        };

        let rendered = stage_reports(&[report]);

        assert!(rendered.contains("interrupted"));
        assert!(rendered.contains("monomer_protein"));
    }
}
