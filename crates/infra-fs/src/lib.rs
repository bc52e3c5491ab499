// foldbench Infrastructure - Filesystem Adapters
// Implements: TableStore (CSV), PredictionSource (seed/sample directory layout)

pub mod csv_table_store;
pub mod prediction_layout;

pub use csv_table_store::CsvTableStore;
pub use prediction_layout::SeedSampleLayout;
