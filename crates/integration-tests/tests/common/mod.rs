//! Shared fixtures: a benchmark directory tree and fake `ost` / `DockQ` scripts

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const STRUCTURE_REPORT: &str = r#"{"dockq_interfaces": [["A", "C"]], "dockq": [0.5], "irmsd": [1.0], "lrmsd": [2.0], "lddt": 0.8, "tm_score": 0.9, "oligo_gdtts": 0.7, "rmsd": 1.5}"#;

pub const LIGAND_REPORT: &str = r#"{"rmsd": {"assigned_scores": [{"reference_ligand": "L.ATP.1", "score": 1.1, "lddt_lp": 0.9}]}, "lddt_pli": {"assigned_scores": [{"reference_ligand": "L.ATP.1", "score": 0.88}]}}"#;

pub const DOCKQ_REPORT: &str = r#"{"best_dockq": 0.6, "best_result": {"AC": {"DockQ": 0.6, "iRMSD": 1.2, "LRMSD": 3.4}}, "GlobalDockQ": 0.6}"#;

/// Benchmark layout rooted in a temp dir
pub struct Bench {
    pub dir: tempfile::TempDir,
}

impl Bench {
    pub fn new() -> Self {
        let bench = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        for sub in ["targets", "gt", "preds", "eval", "bin"] {
            std::fs::create_dir_all(bench.path(sub)).unwrap();
        }
        bench
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    /// One prediction in the seed/sample layout, with its confidence file
    pub fn prediction(&self, name: &str, seed: &str, sample: u32, ranking_score: f64) {
        let dir = format!("preds/{}/seed_{}/predictions", name, seed);
        self.write(
            &format!("{}/{}_seed_{}_sample_{}_postprocessed.cif", dir, name, seed, sample),
            "data_model\n",
        );
        self.write(
            &format!("{}/{}_seed_{}_summary_confidence_sample_{}.json", dir, name, seed, sample),
            &format!(r#"{{"ranking_score": {}}}"#, ranking_score),
        );
    }

    /// Executable shell script under `bin/`
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(&format!("bin/{}", name), &format!("#!/bin/sh\n{}", body));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    /// `ost` stand-in writing canned reports to the `-o` path
    #[cfg(unix)]
    pub fn fake_ost(&self) -> String {
        self.script(
            "ost",
            &format!(
                r#"mode="$1"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
if [ "$mode" = "compare-ligand-structures" ]; then
  printf '%s' '{}' > "$out"
else
  printf '%s' '{}' > "$out"
fi
"#,
                LIGAND_REPORT, STRUCTURE_REPORT
            ),
        )
    }

    /// `DockQ` stand-in writing a canned report to the `--json` path
    #[cfg(unix)]
    pub fn fake_dockq(&self) -> String {
        self.script(
            "DockQ",
            &format!(
                r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--json" ]; then out="$2"; fi
  shift
done
printf '%s' '{}' > "$out"
"#,
                DOCKQ_REPORT
            ),
        )
    }
}

pub fn exists(path: &Path) -> bool {
    path.is_file()
}
