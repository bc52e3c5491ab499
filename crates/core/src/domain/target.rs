// Target Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Benchmark category a target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    InterfaceProteinLigand,
    InterfaceProteinProtein,
    InterfaceAntibodyAntigen,
    InterfaceProteinDna,
    InterfaceProteinRna,
    InterfaceProteinPeptide,
    MonomerProtein,
    MonomerDna,
    MonomerRna,
}

/// Which `ost` comparison a target is scored with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Structure,
    Ligand,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Structure => "structure",
            ScoringMode::Ligand => "ligand",
        }
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TargetType {
    /// All target types in summary table order
    pub const ALL: [TargetType; 9] = [
        TargetType::InterfaceProteinLigand,
        TargetType::InterfaceProteinProtein,
        TargetType::InterfaceAntibodyAntigen,
        TargetType::InterfaceProteinDna,
        TargetType::InterfaceProteinRna,
        TargetType::InterfaceProteinPeptide,
        TargetType::MonomerProtein,
        TargetType::MonomerDna,
        TargetType::MonomerRna,
    ];

    /// Targets evaluated when none are requested explicitly
    pub const DEFAULTS: [TargetType; 4] = [
        TargetType::InterfaceProteinLigand,
        TargetType::InterfaceAntibodyAntigen,
        TargetType::InterfaceProteinDna,
        TargetType::MonomerProtein,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::InterfaceProteinLigand => "interface_protein_ligand",
            TargetType::InterfaceProteinProtein => "interface_protein_protein",
            TargetType::InterfaceAntibodyAntigen => "interface_antibody_antigen",
            TargetType::InterfaceProteinDna => "interface_protein_dna",
            TargetType::InterfaceProteinRna => "interface_protein_rna",
            TargetType::InterfaceProteinPeptide => "interface_protein_peptide",
            TargetType::MonomerProtein => "monomer_protein",
            TargetType::MonomerDna => "monomer_dna",
            TargetType::MonomerRna => "monomer_rna",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        TargetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTargetType(s.to_string()))
    }

    pub fn scoring_mode(&self) -> ScoringMode {
        match self {
            TargetType::InterfaceProteinLigand => ScoringMode::Ligand,
            _ => ScoringMode::Structure,
        }
    }

    /// Nucleic-acid interfaces are also scored with DockQ v2
    pub fn needs_dockq(&self) -> bool {
        matches!(
            self,
            TargetType::InterfaceProteinDna | TargetType::InterfaceProteinRna
        )
    }

    pub fn is_monomer(&self) -> bool {
        matches!(
            self,
            TargetType::MonomerProtein | TargetType::MonomerDna | TargetType::MonomerRna
        )
    }

    /// Metrics reported for this target in the summary table
    pub fn summary_metrics(&self) -> &'static [&'static str] {
        match self {
            TargetType::InterfaceProteinLigand => {
                &["rmsd_lddt-pli_success_rate", "lddt-lp", "lddt-pli"]
            }
            TargetType::MonomerProtein | TargetType::MonomerDna | TargetType::MonomerRna => {
                &["gdt-ts", "tm-score", "rmsd", "lddt"]
            }
            _ => &["dockq_score_success_rate", "irmsd", "lrmsd", "lddt"],
        }
    }
}

impl FromStr for TargetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        TargetType::parse(s)
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
