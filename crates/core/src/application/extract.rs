// Metric extraction from tool detail files
//
// Every field is read independently: a malformed or absent field leaves that
// metric empty without discarding the others.

use crate::domain::{ChainPair, Record};
use serde_json::Value;
use std::path::Path;

/// Scores read from an `ost compare-structures` report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureScores {
    pub dockq: Option<f64>,
    pub irmsd: Option<f64>,
    pub lrmsd: Option<f64>,
    pub len_dockq: Option<usize>,
    pub lddt: Option<f64>,
    pub tm_score: Option<f64>,
    pub gdt_ts: Option<f64>,
    pub rmsd: Option<f64>,
}

impl StructureScores {
    pub const COLUMNS: [&'static str; 8] = [
        "dockq_score",
        "irmsd",
        "lrmsd",
        "len_dockq",
        "lddt",
        "tm_score",
        "gdt_ts",
        "rmsd",
    ];

    pub fn write_to(&self, record: &mut Record) {
        record.set_opt_f64("dockq_score", self.dockq);
        record.set_opt_f64("irmsd", self.irmsd);
        record.set_opt_f64("lrmsd", self.lrmsd);
        record.set(
            "len_dockq",
            self.len_dockq.map(|n| n.to_string()).unwrap_or_default(),
        );
        record.set_opt_f64("lddt", self.lddt);
        record.set_opt_f64("tm_score", self.tm_score);
        record.set_opt_f64("gdt_ts", self.gdt_ts);
        record.set_opt_f64("rmsd", self.rmsd);
    }
}

/// Scores read from an `ost compare-ligand-structures` report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LigandScores {
    pub rmsd: Option<f64>,
    pub lddt_lp: Option<f64>,
    pub lddt_pli: Option<f64>,
}

impl LigandScores {
    pub const COLUMNS: [&'static str; 3] = ["rmsd", "lddt-lp", "lddt-pli"];

    pub fn write_to(&self, record: &mut Record) {
        record.set_opt_f64("rmsd", self.rmsd);
        record.set_opt_f64("lddt-lp", self.lddt_lp);
        record.set_opt_f64("lddt-pli", self.lddt_pli);
    }
}

/// Scores of the first interface in a DockQ v2 report
#[derive(Debug, Clone, PartialEq)]
pub struct DockqScores {
    pub interface: String,
    pub lrmsd: f64,
    pub irmsd: f64,
    pub dockq: f64,
}

impl DockqScores {
    pub const COLUMNS: [&'static str; 3] = ["lrmsd", "irmsd", "dockq_score"];

    pub fn write_to(&self, record: &mut Record) {
        record.set_opt_f64("lrmsd", Some(self.lrmsd));
        record.set_opt_f64("irmsd", Some(self.irmsd));
        record.set_opt_f64("dockq_score", Some(self.dockq));
    }
}

/// Read a detail JSON file; `Ok(None)` when the file does not exist
pub async fn read_detail(path: &Path) -> std::io::Result<Option<Value>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| !v.is_nan())
}

/// True if an interface entry names the chain
///
/// `ost` writes interfaces as `[chain, chain]`; a plain string is matched by
/// containment.
fn interface_contains(interface: &Value, chain: &str) -> bool {
    match interface {
        Value::Array(items) => items.iter().any(|c| c.as_str() == Some(chain)),
        Value::String(s) => s.contains(chain),
        _ => false,
    }
}

/// Scores for `chains` from a structure comparison report
///
/// When several interfaces contain both chains the last one wins. Without a
/// chain pair only the global scores are read.
pub fn structure_scores(doc: &Value, chains: Option<&ChainPair>) -> StructureScores {
    let mut scores = StructureScores::default();

    let interfaces = doc.get("dockq_interfaces").and_then(Value::as_array);
    if let (Some(interfaces), Some(chains)) = (interfaces, chains) {
        for (i, interface) in interfaces.iter().enumerate() {
            if interface_contains(interface, &chains.first)
                && interface_contains(interface, &chains.second)
            {
                scores.dockq = number(doc.get("dockq").and_then(|v| v.get(i)));
                scores.irmsd = number(doc.get("irmsd").and_then(|v| v.get(i)));
                scores.lrmsd = number(doc.get("lrmsd").and_then(|v| v.get(i)));
            }
        }
    }

    scores.len_dockq = doc.get("dockq").and_then(Value::as_array).map(Vec::len);
    scores.lddt = number(doc.get("lddt"));
    scores.tm_score = number(doc.get("tm_score"));
    scores.gdt_ts = number(doc.get("oligo_gdtts"));
    scores.rmsd = number(doc.get("rmsd"));
    scores
}

/// Assigned-score entries whose reference ligand sits on `chain`
///
/// Reference ligands are named `<chain>.<residue>...`.
fn assigned_for<'a>(doc: &'a Value, section: &str, chain: &'a str) -> impl Iterator<Item = &'a Value> {
    doc.get(section)
        .and_then(|s| s.get("assigned_scores"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |item| {
            item.get("reference_ligand")
                .and_then(Value::as_str)
                .and_then(|name| name.split('.').next())
                == Some(chain)
        })
}

/// Scores for the ligand on the second chain from a ligand comparison report
pub fn ligand_scores(doc: &Value, chains: &ChainPair) -> LigandScores {
    let mut scores = LigandScores::default();

    if let Some(item) = assigned_for(doc, "rmsd", &chains.second).last() {
        scores.rmsd = number(item.get("score"));
        scores.lddt_lp = number(item.get("lddt_lp"));
    }
    if let Some(item) = assigned_for(doc, "lddt_pli", &chains.second).last() {
        scores.lddt_pli = number(item.get("score"));
    }
    scores
}

/// First interface of `best_result` in file order
pub fn dockq_scores(doc: &Value) -> Option<DockqScores> {
    let (interface, result) = doc.get("best_result")?.as_object()?.iter().next()?;
    Some(DockqScores {
        interface: interface.clone(),
        lrmsd: number(result.get("LRMSD"))?,
        irmsd: number(result.get("iRMSD"))?,
        dockq: number(result.get("DockQ"))?,
    })
}
