// Table Store Port
// Persistence of CSV-shaped tables (targets, prediction summaries, results)

use crate::domain::Frame;
use std::path::Path;
use thiserror::Error;

/// Table persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Malformed table {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// Table store trait
///
/// Implementations:
/// - CsvTableStore: CSV files on disk
/// - InMemoryTableStore: path-keyed map (tests)
pub trait TableStore: Send + Sync {
    /// Load a table with its header row
    ///
    /// # Errors
    /// - StoreError::NotFound if the path does not exist
    /// - StoreError::Malformed if rows do not match the header
    fn load(&self, path: &Path) -> Result<Frame, StoreError>;

    /// Write a table, creating parent directories as needed
    fn save(&self, path: &Path, frame: &Frame) -> Result<(), StoreError>;

    fn exists(&self, path: &Path) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory table store keyed by path
    #[derive(Default)]
    pub struct InMemoryTableStore {
        tables: Mutex<HashMap<PathBuf, Frame>>,
    }

    impl InMemoryTableStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, path: impl Into<PathBuf>, frame: Frame) {
            self.tables.lock().unwrap().insert(path.into(), frame);
        }

        pub fn get(&self, path: &Path) -> Option<Frame> {
            self.tables.lock().unwrap().get(path).cloned()
        }
    }

    impl TableStore for InMemoryTableStore {
        fn load(&self, path: &Path) -> Result<Frame, StoreError> {
            self.get(path)
                .ok_or_else(|| StoreError::NotFound(path.display().to_string()))
        }

        fn save(&self, path: &Path, frame: &Frame) -> Result<(), StoreError> {
            self.insert(path, frame.clone());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.tables.lock().unwrap().contains_key(path)
        }
    }
}
