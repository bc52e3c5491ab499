// Domain Layer - Pure benchmark entities

pub mod error;
pub mod frame;
pub mod metric;
pub mod target;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use frame::{is_missing, Frame, Record, RowRef};
pub use metric::{Direction, MetricType, SuccessCriterion};
pub use target::{ScoringMode, TargetType};
pub use task::{ChainPair, PredictionRecord, ScoringTask};
