// Scoring Tool Port
// Abstraction over the external structural-comparison tools (ost, DockQ)

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Result of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub stderr: Option<String>,
}

/// Tool exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Success,
    Failed,
}

/// Tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Tool timeout after {0}ms")]
    Timeout(i64),

    #[error("Process killed: {0}")]
    Killed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Model vs. reference comparison written to `output`
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub model: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
}

/// DockQ v2 run restricted to the given native chains
///
/// Model chains are left open so the tool searches the chain mapping.
#[derive(Debug, Clone)]
pub struct DockqRequest {
    pub model: PathBuf,
    pub native: PathBuf,
    pub native_chains: Vec<String>,
    pub small_molecule: bool,
    pub allowed_mismatches: u32,
    pub output: PathBuf,
}

/// Scoring Tool trait
///
/// Implementations:
/// - OstDockqTool: spawns `ost` / `DockQ` subprocesses
/// - MockScoringTool: writes canned JSON (tests)
#[async_trait]
pub trait ScoringTool: Send + Sync {
    /// `ost compare-structures` (lDDT, rigid scores, TM-score, DockQ)
    ///
    /// # Errors
    /// - ToolError::SpawnFailed if the process cannot be started
    /// - ToolError::Timeout if the run exceeds the configured timeout
    async fn compare_structures(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ToolOutcome, ToolError>;

    /// `ost compare-ligand-structures` (ligand RMSD, lDDT-PLI)
    async fn compare_ligands(&self, request: &ComparisonRequest)
        -> Result<ToolOutcome, ToolError>;

    /// DockQ v2 with JSON output
    async fn dockq(&self, request: &DockqRequest) -> Result<ToolOutcome, ToolError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock tool behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Write the JSON document to the requested output path
        WriteJson(serde_json::Value),
        /// Exit non-zero without writing output
        ExitFailure,
        /// Fail to spawn with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Time out after N ms
        Timeout(i64),
    }

    type CallHook = Box<dyn Fn() + Send + Sync>;

    /// Mock Scoring Tool for testing
    pub struct MockScoringTool {
        structure: Arc<Mutex<MockBehavior>>,
        ligand: Arc<Mutex<MockBehavior>>,
        dockq: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
        dockq_requests: Arc<Mutex<Vec<DockqRequest>>>,
        after_call: Option<CallHook>,
    }

    impl MockScoringTool {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                structure: Arc::new(Mutex::new(behavior.clone())),
                ligand: Arc::new(Mutex::new(behavior.clone())),
                dockq: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
                dockq_requests: Arc::new(Mutex::new(Vec::new())),
                after_call: None,
            }
        }

        pub fn with_ligand(self, behavior: MockBehavior) -> Self {
            *self.ligand.lock().unwrap() = behavior;
            self
        }

        pub fn with_dockq(self, behavior: MockBehavior) -> Self {
            *self.dockq.lock().unwrap() = behavior;
            self
        }

        /// Run `hook` after every call, once the behavior has been applied
        pub fn with_after_call(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.after_call = Some(Box::new(hook));
            self
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        pub fn dockq_requests(&self) -> Vec<DockqRequest> {
            self.dockq_requests.lock().unwrap().clone()
        }

        fn run(
            &self,
            behavior: &Arc<Mutex<MockBehavior>>,
            output: &std::path::Path,
        ) -> Result<ToolOutcome, ToolError> {
            *self.call_count.lock().unwrap() += 1;
            let behavior = behavior.lock().unwrap().clone();

            let outcome = self.apply(behavior, output);
            if let Some(hook) = &self.after_call {
                hook();
            }
            outcome
        }

        fn apply(
            &self,
            behavior: MockBehavior,
            output: &std::path::Path,
        ) -> Result<ToolOutcome, ToolError> {
            match behavior {
                MockBehavior::WriteJson(value) => {
                    let body = serde_json::to_vec_pretty(&value)
                        .map_err(|e| ToolError::IoError(e.to_string()))?;
                    std::fs::write(output, body).map_err(|e| ToolError::IoError(e.to_string()))?;
                    Ok(ToolOutcome {
                        status: ToolStatus::Success,
                        duration_ms: 10,
                        exit_code: Some(0),
                        stderr: None,
                    })
                }
                MockBehavior::ExitFailure => Ok(ToolOutcome {
                    status: ToolStatus::Failed,
                    duration_ms: 10,
                    exit_code: Some(1),
                    stderr: Some("mock failure".to_string()),
                }),
                MockBehavior::Fail(msg) => Err(ToolError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Timeout(ms) => Err(ToolError::Timeout(ms)),
            }
        }
    }

    #[async_trait]
    impl ScoringTool for MockScoringTool {
        async fn compare_structures(
            &self,
            request: &ComparisonRequest,
        ) -> Result<ToolOutcome, ToolError> {
            self.run(&self.structure, &request.output)
        }

        async fn compare_ligands(
            &self,
            request: &ComparisonRequest,
        ) -> Result<ToolOutcome, ToolError> {
            self.run(&self.ligand, &request.output)
        }

        async fn dockq(&self, request: &DockqRequest) -> Result<ToolOutcome, ToolError> {
            self.dockq_requests.lock().unwrap().push(request.clone());
            self.run(&self.dockq, &request.output)
        }
    }
}
