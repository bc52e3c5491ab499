// Port Layer - Interfaces for external dependencies

pub mod prediction_source;
pub mod scoring_tool;
pub mod system_probe;
pub mod table_store;
pub mod time_provider;

// Re-exports
pub use prediction_source::{PredictionQuery, PredictionSource};
pub use scoring_tool::{
    ComparisonRequest, DockqRequest, ScoringTool, ToolError, ToolOutcome, ToolStatus,
};
pub use system_probe::{SystemMetrics, SystemProbe};
pub use table_store::{StoreError, TableStore};
pub use time_provider::TimeProvider;
