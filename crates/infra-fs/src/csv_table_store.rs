// CSV table store
// reason: csv crate for quoting / header handling
use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;
use tracing::debug;

use foldbench_core::domain::Frame;
use foldbench_core::port::table_store::{StoreError, TableStore};

/// Tables as comma-separated files with a header row
#[derive(Debug, Clone, Default)]
pub struct CsvTableStore;

impl CsvTableStore {
    pub fn new() -> Self {
        Self
    }
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Malformed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), err))
}

impl TableStore for CsvTableStore {
    fn load(&self, path: &Path) -> Result<Frame, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| io_error(path, e))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| malformed(path, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| malformed(path, e))?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        debug!(path = %path.display(), columns = columns.len(), rows = rows.len(), "Loaded table");
        Frame::from_rows(columns, rows).map_err(|e| malformed(path, e))
    }

    fn save(&self, path: &Path, frame: &Frame) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| io_error(path, e))?;
        writer
            .write_record(frame.columns())
            .map_err(|e| io_error(path, e))?;
        for row in frame.raw_rows() {
            writer.write_record(row).map_err(|e| io_error(path, e))?;
        }
        writer.flush().map_err(|e| io_error(path, e))?;

        debug!(path = %path.display(), rows = frame.len(), "Saved table");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_keeps_columns_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("monomer_protein_ost.csv");
        let frame = Frame::from_rows(
            vec!["pdb_id".to_string(), "note".to_string(), "lddt".to_string()],
            vec![vec!["1abc".to_string(), "a, b".to_string(), String::new()]],
        )
        .unwrap();

        let store = CsvTableStore::new();
        store.save(&path, &frame).unwrap();
        assert!(store.exists(&path));

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, frame);
        assert_eq!(loaded.row(0).unwrap().get("note"), Some("a, b"));
        assert_eq!(loaded.row(0).unwrap().get("lddt"), None);
    }

    #[test]
    fn test_load_missing_and_ragged() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvTableStore::new();

        let missing = store.load(&dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        let ragged = dir.path().join("ragged.csv");
        std::fs::write(&ragged, "pdb_id,seed\n1abc,42,extra\n").unwrap();
        assert!(matches!(
            store.load(&ragged),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_pandas_style_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interface_protein_dna.csv");
        std::fs::write(
            &path,
            "pdb_id,native_chain_id_1,native_chain_id_2,dockq_score\n7abc,A,C,0.41\n7abd,B,D,\n",
        )
        .unwrap();

        let frame = CsvTableStore::new().load(&path).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.row(0).unwrap().get_f64("dockq_score"), Some(0.41));
        assert_eq!(frame.row(1).unwrap().get_f64("dockq_score"), None);
    }
}
