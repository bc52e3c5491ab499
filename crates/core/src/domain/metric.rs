// Metric definitions for summary aggregation

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// DockQ at or above this counts as an acceptable interface
pub const DOCKQ_SUCCESS_THRESHOLD: f64 = 0.23;

/// Ligand / monomer RMSD below this (Angstrom) counts as a success
pub const RMSD_SUCCESS_THRESHOLD: f64 = 2.0;

/// lDDT-PLI above this is required for a ligand pose success
pub const LDDT_PLI_SUCCESS_THRESHOLD: f64 = 0.8;

/// How the representative prediction of a target is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Highest `ranking_score` (what the algorithm would submit)
    Rank,
    /// Best value of the metric itself (oracle selection)
    Best,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Rank => "rank",
            MetricType::Best => "best",
        }
    }
}

impl FromStr for MetricType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rank" => Ok(MetricType::Rank),
            "best" => Ok(MetricType::Best),
            other => Err(DomainError::UnknownMetricType(other.to_string())),
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether larger or smaller values are better
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Direction of a result-table column, `None` for non-metric columns
    pub fn of(column: &str) -> Option<Self> {
        match column {
            "dockq_score" | "lddt-lp" | "lddt-pli" | "gdt-ts" | "gdt_ts" | "tm-score"
            | "tm_score" | "lddt" => Some(Direction::HigherIsBetter),
            "irmsd" | "lrmsd" | "rmsd" => Some(Direction::LowerIsBetter),
            _ => None,
        }
    }

    /// True if `candidate` strictly beats `current`
    pub fn improves(&self, candidate: f64, current: f64) -> bool {
        match self {
            Direction::HigherIsBetter => candidate > current,
            Direction::LowerIsBetter => candidate < current,
        }
    }
}

/// Success criteria reported as rates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessCriterion {
    /// DockQ >= 0.23
    DockQ,
    /// RMSD < 2.0
    Rmsd,
    /// RMSD < 2.0 and lDDT-PLI > 0.8
    RmsdLddtPli,
}

impl SuccessCriterion {
    /// Columns that must be present for a row to be counted
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            SuccessCriterion::DockQ => &["dockq_score"],
            SuccessCriterion::Rmsd => &["rmsd"],
            SuccessCriterion::RmsdLddtPli => &["rmsd", "lddt-pli"],
        }
    }

    /// Column used to pick the best row in `best` mode
    pub fn selection_column(&self) -> &'static str {
        match self {
            SuccessCriterion::DockQ => "dockq_score",
            SuccessCriterion::Rmsd | SuccessCriterion::RmsdLddtPli => "rmsd",
        }
    }

    /// Evaluate the criterion on the required values, in `required_columns` order
    pub fn is_success(&self, values: &[f64]) -> bool {
        match (self, values) {
            (SuccessCriterion::DockQ, [dockq]) => *dockq >= DOCKQ_SUCCESS_THRESHOLD,
            (SuccessCriterion::Rmsd, [rmsd]) => *rmsd < RMSD_SUCCESS_THRESHOLD,
            (SuccessCriterion::RmsdLddtPli, [rmsd, pli]) => {
                *rmsd < RMSD_SUCCESS_THRESHOLD && *pli > LDDT_PLI_SUCCESS_THRESHOLD
            }
            _ => false,
        }
    }
}
