// Application Layer - Use Cases and Business Logic

pub mod collect;
pub mod evaluation;
pub mod extract;
pub mod summary;
pub mod worker;

// Re-exports
pub use collect::{CollectConfig, CollectService};
pub use evaluation::{EvaluationConfig, EvaluationService, Stage, StageReport};
pub use summary::{SummaryConfig, SummaryService, SummaryTable};
pub use worker::{shutdown_channel, JobOutcome, ShutdownSender, ShutdownToken, WorkerPool};
